//! Access engine for the data ingestion portal.
//!
//! Turns a user's directory group memberships into roles and
//! country/dataset grants, lets an operator edit them, and computes the
//! minimal membership change that moves the user from what they have to
//! what was chosen.

pub mod access;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod diff;
pub mod directory;
pub mod error;
pub mod session;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "tests"))]
pub mod tests;

pub use access::{AccessSet, CountryRow, FormIssue, FormOptions, PendingForm};
pub use catalog::{Catalog, GroupCatalog, KnownRoles, RoleClassifier};
pub use codec::{Atom, DEFAULT_SEPARATOR, Decoded, GrantAtom, GroupNameCodec};
pub use crate::config::{AccessConfig, ConsoleConfig, DirectoryConfig};
pub use diff::{
    MembershipDelta, ResolvedDelta, UnresolvedAtom, UnresolvedReason, compute_delta, diff, resolve,
};
pub use directory::{Directory, DirectoryError, MembershipChangeRequest};
pub use error::{AccessError, Result};
pub use session::{EditSession, Preview, SessionState, SubmitReport};
pub use summary::{Summary, join_with_and, pluralize, summarize};
pub use types::{
    DirectoryGroup, DirectoryUser, Group, GroupId, UserId, UserIdentity, UserUpdate,
};
pub use validation::ValidateConfig;
