//! Group catalog: the authoritative list of directory groups and their ids

use crate::directory::DirectoryError;
use crate::types::{Group, GroupId};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Source of the full group catalog.
///
/// Implementations must return every group; a partial page would silently
/// leave grants unresolved.
#[async_trait]
pub trait GroupCatalog: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError>;
}

/// Decides which catalog groups are roles.
///
/// The directory is the source of truth for this, so it is supplied by the
/// caller instead of being inferred from the shape of a name.
pub trait RoleClassifier: Send + Sync {
    fn is_role(&self, group_name: &str) -> bool;
}

impl<F> RoleClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_role(&self, group_name: &str) -> bool {
        self(group_name)
    }
}

/// Classifier backed by a fixed list of role names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownRoles(BTreeSet<String>);

impl KnownRoles {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }
}

impl RoleClassifier for KnownRoles {
    fn is_role(&self, group_name: &str) -> bool {
        self.0.contains(group_name)
    }
}

/// Snapshot of the catalog for one edit session
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<Group>,
    by_name: HashMap<String, GroupId>,
}

impl Catalog {
    #[must_use]
    pub fn new(groups: Vec<Group>) -> Self {
        let mut by_name = HashMap::with_capacity(groups.len());
        for group in &groups {
            if by_name.contains_key(&group.name) {
                tracing::warn!(
                    group = %group.name,
                    id = %group.id,
                    "Duplicate group name in catalog, keeping first id"
                );
                continue;
            }
            by_name.insert(group.name.clone(), group.id.clone());
        }
        Self { groups, by_name }
    }

    /// Fetch the catalog from its source
    pub async fn load(source: &dyn GroupCatalog) -> Result<Self, DirectoryError> {
        let groups = source.list_groups().await?;
        tracing::debug!(groups = groups.len(), "Loaded group catalog");
        Ok(Self::new(groups))
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Exact-name lookup
    #[must_use]
    pub fn find_id(&self, name: &str) -> Option<&GroupId> {
        self.by_name.get(name)
    }

    /// Names of every catalog group the classifier recognizes as a role
    #[must_use]
    pub fn role_names(&self, classifier: &dyn RoleClassifier) -> BTreeSet<String> {
        self.groups
            .iter()
            .filter(|group| classifier.is_role(&group.name))
            .map(|group| group.name.clone())
            .collect()
    }
}

impl From<Vec<Group>> for Catalog {
    fn from(groups: Vec<Group>) -> Self {
        Self::new(groups)
    }
}
