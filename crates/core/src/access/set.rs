use crate::codec::{Atom, Decoded, GrantAtom, GroupNameCodec};
use crate::error::{AccessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Normalized access held by a user: a set of roles plus, per country,
/// the set of datasets granted.
///
/// A country key never maps to an empty dataset set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSet {
    roles: BTreeSet<String>,
    grants: BTreeMap<String, BTreeSet<String>>,
    /// Group names the codec could not classify. Kept verbatim, never diffed.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    unrecognized: BTreeSet<String>,
}

impl AccessSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an access set from a user's group names.
    ///
    /// The result does not depend on the order of `group_names`.
    pub fn build<I, S>(group_names: I, known_roles: &BTreeSet<String>, codec: &GroupNameCodec) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for name in group_names {
            match codec.decode(name.as_ref(), known_roles) {
                Decoded::Role(role) => {
                    set.roles.insert(role);
                }
                Decoded::Grant(GrantAtom { country, dataset }) => {
                    set.grants.entry(country).or_default().insert(dataset);
                }
                Decoded::Unrecognized(name) => {
                    tracing::debug!(group = %name, "Carrying unrecognized group name");
                    set.unrecognized.insert(name);
                }
            }
        }
        set.debug_check_invariants();
        set
    }

    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub const fn grants(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.grants
    }

    #[must_use]
    pub const fn unrecognized(&self) -> &BTreeSet<String> {
        &self.unrecognized
    }

    /// Datasets granted for a country, if any
    #[must_use]
    pub fn datasets(&self, country: &str) -> Option<&BTreeSet<String>> {
        self.grants.get(country)
    }

    #[must_use]
    pub fn has_grant(&self, country: &str, dataset: &str) -> bool {
        self.grants
            .get(country)
            .is_some_and(|datasets| datasets.contains(dataset))
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Grant a dataset for a country, creating the country entry on first use.
    /// Returns whether the grant was newly added.
    pub fn add_grant(&mut self, country: impl Into<String>, dataset: impl Into<String>) -> bool {
        let added = self
            .grants
            .entry(country.into())
            .or_default()
            .insert(dataset.into());
        self.debug_check_invariants();
        added
    }

    /// Revoke a dataset for a country. Removing the last dataset drops the
    /// country entry. Returns whether anything was removed.
    pub fn remove_grant(&mut self, country: &str, dataset: &str) -> bool {
        let Some(datasets) = self.grants.get_mut(country) else {
            return false;
        };
        let removed = datasets.remove(dataset);
        if datasets.is_empty() {
            self.grants.remove(country);
        }
        self.debug_check_invariants();
        removed
    }

    /// Drop every grant for a country
    pub fn remove_country(&mut self, country: &str) -> bool {
        self.grants.remove(country).is_some()
    }

    /// Replace the role set
    pub fn set_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
    }

    pub fn add_role(&mut self, role: impl Into<String>) -> bool {
        self.roles.insert(role.into())
    }

    pub fn remove_role(&mut self, role: &str) -> bool {
        self.roles.remove(role)
    }

    pub(crate) fn carry_unrecognized(&mut self, names: impl IntoIterator<Item = String>) {
        self.unrecognized.extend(names);
    }

    /// Every `(country, dataset)` pair as a flat list of grant atoms
    pub fn grant_atoms(&self) -> impl Iterator<Item = GrantAtom> + '_ {
        self.grants.iter().flat_map(|(country, datasets)| {
            datasets
                .iter()
                .map(move |dataset| GrantAtom::new(country.as_str(), dataset.as_str()))
        })
    }

    /// Flatten into the atom set compared by the diff engine
    #[must_use]
    pub fn atoms(&self) -> BTreeSet<Atom> {
        self.grant_atoms()
            .map(Atom::Grant)
            .chain(self.roles.iter().map(Atom::role))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.grants.is_empty()
    }

    /// Verify that no country entry is left without datasets
    pub fn check_invariants(&self) -> Result<()> {
        match self.grants.iter().find(|(_, datasets)| datasets.is_empty()) {
            Some((country, _)) => Err(AccessError::EmptySelection {
                country: country.clone(),
            }),
            None => Ok(()),
        }
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "access set invariant violated: {:?}",
            self.check_invariants()
        );
    }
}
