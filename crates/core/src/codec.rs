//! Bidirectional codec between access atoms and flat directory group names
//!
//! Role groups are named by the role itself. Grant groups join a country
//! and a dataset with a single reserved separator, `Kenya-School QoS`.
//! Whether a name denotes a role is a catalog fact, so decoding takes the
//! set of known role names rather than guessing from the string shape.

use crate::error::{AccessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// Separator used by the directory between country and dataset
pub const DEFAULT_SEPARATOR: char = '-';

/// A single `(country, dataset)` access grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantAtom {
    pub country: String,
    pub dataset: String,
}

impl GrantAtom {
    pub fn new(country: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            dataset: dataset.into(),
        }
    }
}

impl Display for GrantAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.country, self.dataset)
    }
}

/// Smallest diffable unit of access.
///
/// Grants sort before roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Atom {
    Grant(GrantAtom),
    Role { name: String },
}

impl Atom {
    pub fn role(name: impl Into<String>) -> Self {
        Self::Role { name: name.into() }
    }

    pub fn grant(country: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self::Grant(GrantAtom::new(country, dataset))
    }

    #[must_use]
    pub const fn as_grant(&self) -> Option<&GrantAtom> {
        match self {
            Self::Grant(grant) => Some(grant),
            Self::Role { .. } => None,
        }
    }

    #[must_use]
    pub fn as_role(&self) -> Option<&str> {
        match self {
            Self::Role { name } => Some(name),
            Self::Grant(_) => None,
        }
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant(grant) => write!(f, "grant {grant}"),
            Self::Role { name } => write!(f, "role {name}"),
        }
    }
}

/// Outcome of decoding a group name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Role(String),
    Grant(GrantAtom),
    /// Not understood by this engine; carried through untouched.
    Unrecognized(String),
}

/// Encodes and decodes group names around one reserved separator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNameCodec {
    separator: char,
}

impl Default for GroupNameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl GroupNameCodec {
    #[must_use]
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    #[must_use]
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Check that a value can be used as one side of a grant name
    pub fn validate_component(&self, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(AccessError::EmptyComponent);
        }
        if value.contains(self.separator) {
            return Err(AccessError::reserved_separator(value, self.separator));
        }
        Ok(())
    }

    /// Encode a grant as its directory group name
    pub fn encode_grant(&self, grant: &GrantAtom) -> Result<String> {
        self.validate_component(&grant.country)?;
        self.validate_component(&grant.dataset)?;
        Ok(format!("{}{}{}", grant.country, self.separator, grant.dataset))
    }

    /// Encode any atom as its directory group name
    pub fn encode(&self, atom: &Atom) -> Result<String> {
        match atom {
            Atom::Grant(grant) => self.encode_grant(grant),
            Atom::Role { name } if name.trim().is_empty() => Err(AccessError::EmptyComponent),
            Atom::Role { name } => Ok(name.clone()),
        }
    }

    /// Decode a group name. Never fails: names that are neither a known
    /// role nor a well-formed grant come back as [`Decoded::Unrecognized`].
    #[must_use]
    pub fn decode(&self, name: &str, known_roles: &BTreeSet<String>) -> Decoded {
        if known_roles.contains(name) {
            return Decoded::Role(name.to_string());
        }

        let mut parts = name.split(self.separator);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(country), Some(dataset), None)
                if !country.trim().is_empty() && !dataset.trim().is_empty() =>
            {
                Decoded::Grant(GrantAtom::new(country, dataset))
            }
            _ => Decoded::Unrecognized(name.to_string()),
        }
    }
}
