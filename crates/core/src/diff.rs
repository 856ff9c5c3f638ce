//! Diff engine: compares two access sets atom by atom and resolves the
//! resulting delta to directory group ids.

use crate::access::AccessSet;
use crate::catalog::{Catalog, RoleClassifier};
use crate::codec::{Atom, GrantAtom, GroupNameCodec};
use crate::types::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// Atoms to add and remove. Iteration order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDelta {
    pub to_add: BTreeSet<Atom>,
    pub to_remove: BTreeSet<Atom>,
}

impl MembershipDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Grants present in `to_add`
    pub fn added_grants(&self) -> impl Iterator<Item = &GrantAtom> {
        self.to_add.iter().filter_map(Atom::as_grant)
    }

    /// Grants present in `to_remove`
    pub fn removed_grants(&self) -> impl Iterator<Item = &GrantAtom> {
        self.to_remove.iter().filter_map(Atom::as_grant)
    }

    pub fn added_roles(&self) -> impl Iterator<Item = &str> {
        self.to_add.iter().filter_map(Atom::as_role)
    }

    pub fn removed_roles(&self) -> impl Iterator<Item = &str> {
        self.to_remove.iter().filter_map(Atom::as_role)
    }

    /// The delta that would undo this one
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            to_add: self.to_remove.clone(),
            to_remove: self.to_add.clone(),
        }
    }
}

/// Compare `initial` against `proposed`.
///
/// Grants are compared pair by pair, so adding a dataset to a country never
/// touches the datasets it already had.
#[must_use]
pub fn diff(initial: &AccessSet, proposed: &AccessSet) -> MembershipDelta {
    let before = initial.atoms();
    let after = proposed.atoms();

    let delta = MembershipDelta {
        to_add: after.difference(&before).cloned().collect(),
        to_remove: before.difference(&after).cloned().collect(),
    };
    tracing::debug!(
        to_add = delta.to_add.len(),
        to_remove = delta.to_remove.len(),
        "Computed membership delta"
    );
    delta
}

/// Build the initial set from a user's group names and diff it against a
/// proposed set. Role names are those catalog groups the classifier accepts.
#[must_use]
pub fn compute_delta<S: AsRef<str>>(
    initial_group_names: &[S],
    proposed: &AccessSet,
    catalog: &Catalog,
    classifier: &dyn RoleClassifier,
    codec: &GroupNameCodec,
) -> MembershipDelta {
    let known_roles = catalog.role_names(classifier);
    let initial = AccessSet::build(initial_group_names, &known_roles, codec);
    diff(&initial, proposed)
}

/// Why an atom could not be mapped to a group id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnresolvedReason {
    /// No catalog group carries the derived name yet
    MissingGroup { group_name: String },
    /// The atom cannot be turned into a group name at all
    InvalidName { message: String },
}

/// An atom dropped from a delta during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedAtom {
    pub atom: Atom,
    pub reason: UnresolvedReason,
}

impl Display for UnresolvedAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnresolvedReason::MissingGroup { group_name } => {
                write!(f, "{}: no directory group named {group_name:?}", self.atom)
            }
            UnresolvedReason::InvalidName { message } => write!(f, "{}: {message}", self.atom),
        }
    }
}

/// A delta mapped onto concrete group ids, plus everything that was dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDelta {
    pub groups_to_add: Vec<GroupId>,
    pub groups_to_remove: Vec<GroupId>,
    pub unresolved: Vec<UnresolvedAtom>,
}

impl ResolvedDelta {
    /// Nothing would be sent to the directory
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.groups_to_add.is_empty() && self.groups_to_remove.is_empty()
    }

    #[must_use]
    pub fn has_anomalies(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// Map every atom of `delta` to a catalog group id by exact name.
///
/// Atoms without a match are dropped and reported in
/// [`ResolvedDelta::unresolved`]; resolution itself never fails.
#[must_use]
pub fn resolve(delta: &MembershipDelta, catalog: &Catalog, codec: &GroupNameCodec) -> ResolvedDelta {
    let mut resolved = ResolvedDelta::default();
    let groups_to_add = resolve_atoms(&delta.to_add, catalog, codec, &mut resolved.unresolved);
    let groups_to_remove = resolve_atoms(&delta.to_remove, catalog, codec, &mut resolved.unresolved);
    resolved.groups_to_add = groups_to_add;
    resolved.groups_to_remove = groups_to_remove;
    resolved
}

fn resolve_atoms(
    atoms: &BTreeSet<Atom>,
    catalog: &Catalog,
    codec: &GroupNameCodec,
    unresolved: &mut Vec<UnresolvedAtom>,
) -> Vec<GroupId> {
    let mut ids = Vec::with_capacity(atoms.len());
    for atom in atoms {
        let reason = match codec.encode(atom) {
            Ok(name) => match catalog.find_id(&name) {
                Some(id) => {
                    ids.push(id.clone());
                    continue;
                }
                None => UnresolvedReason::MissingGroup { group_name: name },
            },
            Err(err) => UnresolvedReason::InvalidName {
                message: err.to_string(),
            },
        };

        let anomaly = UnresolvedAtom {
            atom: atom.clone(),
            reason,
        };
        tracing::warn!(anomaly = %anomaly, "Dropping unresolved atom from membership delta");
        unresolved.push(anomaly);
    }
    ids
}
