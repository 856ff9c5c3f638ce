//! Error taxonomy for the access engine

use crate::access::FormIssue;
use crate::directory::DirectoryError;

/// Standard result type for engine operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors surfaced by the access engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Group name component {value:?} contains the reserved separator '{separator}'")]
    ReservedSeparator { value: String, separator: char },

    #[error("Group name component cannot be empty")]
    EmptyComponent,

    /// A country entry with zero datasets. Never observable outside the model.
    #[error("Country {country:?} has no datasets selected")]
    EmptySelection { country: String },

    #[error("Invalid form: {}", join_issues(.0))]
    InvalidForm(Vec<FormIssue>),

    #[error("Form row {index} does not exist (form has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("Failed to load session data: {0}")]
    Load(DirectoryError),

    #[error("Membership dispatch failed: {0}")]
    Dispatch(DirectoryError),

    #[error("Edit session has already been submitted")]
    SessionClosed,
}

impl AccessError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a reserved separator error
    pub fn reserved_separator(value: impl Into<String>, separator: char) -> Self {
        Self::ReservedSeparator {
            value: value.into(),
            separator,
        }
    }

    /// Whether the caller may retry the same operation unchanged
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Dispatch(err) | Self::Load(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for AccessError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

fn join_issues(issues: &[FormIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
