//! Directory service collaborator: user lookup and membership dispatch

use crate::types::{DirectoryUser, GroupId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failures reported by the directory service or its transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {message}")]
    Unavailable { message: String },

    #[error("Directory rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Not found in directory: {0}")]
    NotFound(String),

    #[error("Directory request timed out")]
    Timeout,
}

impl DirectoryError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Failures that may clear up when the same request is sent again
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Unavailable { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::NotFound(_) => false,
        }
    }
}

/// Single membership change sent on submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChangeRequest {
    pub user_id: UserId,
    pub email: Option<String>,
    pub groups_to_add: Vec<GroupId>,
    pub groups_to_remove: Vec<GroupId>,
}

/// Directory operations the edit session depends on
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch a user together with their current group memberships
    async fn get_user(&self, user_id: &UserId) -> Result<DirectoryUser, DirectoryError>;

    /// Apply one membership delta for a user
    async fn apply_membership_delta(
        &self,
        request: &MembershipChangeRequest,
    ) -> Result<(), DirectoryError>;
}
