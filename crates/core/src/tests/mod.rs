//! Test support for directory implementations
//!
//! [`InMemoryDirectory`] stands in for the directory service in unit tests
//! and in downstream crates built with the `tests` feature.
//! [`DirectorySuite`] runs the behavior every [`Directory`] adapter is
//! expected to show against a seeded backend.

use crate::catalog::GroupCatalog;
use crate::directory::{Directory, DirectoryError, MembershipChangeRequest};
use crate::types::{DirectoryGroup, DirectoryUser, Group, GroupId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Store {
    groups: Vec<Group>,
    users: HashMap<UserId, DirectoryUser>,
    applied: Vec<MembershipChangeRequest>,
    fail_next_dispatch: Option<DirectoryError>,
}

/// Directory and catalog held in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    store: Arc<Mutex<Store>>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                groups,
                ..Store::default()
            })),
        }
    }

    /// Seed a user.
    ///
    /// # Panics
    ///
    /// Panics if the directory has already been cloned.
    #[must_use]
    pub fn with_user(mut self, user: DirectoryUser) -> Self {
        let store = Arc::get_mut(&mut self.store)
            .map(Mutex::get_mut)
            .expect("with_user must be called before the directory is shared");
        store.users.insert(user.id.clone(), user);
        self
    }

    pub async fn insert_user(&self, user: DirectoryUser) {
        self.store.lock().await.users.insert(user.id.clone(), user);
    }

    pub async fn user(&self, user_id: &UserId) -> Option<DirectoryUser> {
        self.store.lock().await.users.get(user_id).cloned()
    }

    /// Every membership change applied so far, oldest first
    pub async fn applied(&self) -> Vec<MembershipChangeRequest> {
        self.store.lock().await.applied.clone()
    }

    /// Make the next dispatch fail with `error` without touching memberships
    pub async fn fail_next_dispatch(&self, error: DirectoryError) {
        self.store.lock().await.fail_next_dispatch = Some(error);
    }
}

#[async_trait]
impl GroupCatalog for InMemoryDirectory {
    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        Ok(self.store.lock().await.groups.clone())
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<DirectoryUser, DirectoryError> {
        self.store
            .lock()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))
    }

    async fn apply_membership_delta(
        &self,
        request: &MembershipChangeRequest,
    ) -> Result<(), DirectoryError> {
        let mut store = self.store.lock().await;
        if let Some(error) = store.fail_next_dispatch.take() {
            return Err(error);
        }

        let mut added = Vec::with_capacity(request.groups_to_add.len());
        for id in &request.groups_to_add {
            let group = store
                .groups
                .iter()
                .find(|group| &group.id == id)
                .ok_or_else(|| DirectoryError::rejected(400, format!("unknown group {id}")))?;
            added.push(DirectoryGroup {
                id: group.id.clone(),
                display_name: group.name.clone(),
                description: None,
                mail: None,
            });
        }

        let user = store
            .users
            .get_mut(&request.user_id)
            .ok_or_else(|| DirectoryError::NotFound(request.user_id.to_string()))?;
        user.member_of
            .retain(|group| !request.groups_to_remove.contains(&group.id));
        for group in added {
            if !user.member_of.iter().any(|existing| existing.id == group.id) {
                user.member_of.push(group);
            }
        }

        store.applied.push(request.clone());
        Ok(())
    }
}

/// Conformance checks for a [`Directory`] adapter.
///
/// The backend must hold a user `subject` who belongs to none of `groups`,
/// and every group in `groups` must exist.
pub struct DirectorySuite<D: Directory> {
    directory: D,
    subject: UserId,
    groups: Vec<GroupId>,
}

impl<D: Directory> DirectorySuite<D> {
    pub fn new(directory: D, subject: UserId, groups: Vec<GroupId>) -> Self {
        Self {
            directory,
            subject,
            groups,
        }
    }

    pub async fn run_all(&self) -> Result<(), DirectoryError> {
        self.check_unknown_user().await?;
        self.check_add_then_remove().await?;
        Ok(())
    }

    pub async fn check_unknown_user(&self) -> Result<(), DirectoryError> {
        let missing = UserId::new(format!("{}-missing", self.subject));
        match self.directory.get_user(&missing).await {
            Err(DirectoryError::NotFound(_)) => Ok(()),
            Err(other) => Err(other),
            Ok(_) => Err(DirectoryError::unavailable(
                "unknown user was returned by the directory",
            )),
        }
    }

    pub async fn check_add_then_remove(&self) -> Result<(), DirectoryError> {
        let add = MembershipChangeRequest {
            user_id: self.subject.clone(),
            email: None,
            groups_to_add: self.groups.clone(),
            groups_to_remove: Vec::new(),
        };
        self.directory.apply_membership_delta(&add).await?;

        let user = self.directory.get_user(&self.subject).await?;
        for id in &self.groups {
            assert!(
                user.member_of.iter().any(|group| &group.id == id),
                "group {id} should be a membership after adding it"
            );
        }

        let remove = MembershipChangeRequest {
            user_id: self.subject.clone(),
            email: None,
            groups_to_add: Vec::new(),
            groups_to_remove: self.groups.clone(),
        };
        self.directory.apply_membership_delta(&remove).await?;

        let user = self.directory.get_user(&self.subject).await?;
        for id in &self.groups {
            assert!(
                !user.member_of.iter().any(|group| &group.id == id),
                "group {id} should be gone after removing it"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod suite_tests {
    use super::*;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new(vec![
            Group::new("g-admin", "Admin"),
            Group::new("g-ke-qos", "Kenya-School QoS"),
        ])
        .with_user(DirectoryUser::new("u-1"))
    }

    #[tokio::test]
    async fn test_in_memory_directory_conforms() {
        let suite = DirectorySuite::new(
            directory(),
            UserId::new("u-1"),
            vec![GroupId::new("g-admin"), GroupId::new("g-ke-qos")],
        );
        suite.run_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_group_is_rejected_without_changes() {
        let directory = directory();
        let request = MembershipChangeRequest {
            user_id: UserId::new("u-1"),
            email: None,
            groups_to_add: vec![GroupId::new("g-admin"), GroupId::new("g-nope")],
            groups_to_remove: Vec::new(),
        };

        let err = directory.apply_membership_delta(&request).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Rejected { status: 400, .. }));
        assert!(directory.applied().await.is_empty());
        let user = directory.user(&UserId::new("u-1")).await.unwrap();
        assert!(user.member_of.is_empty());
    }

    #[tokio::test]
    async fn test_users_inserted_after_sharing_are_visible_to_clones() {
        let directory = directory();
        let shared = directory.clone();
        directory.insert_user(DirectoryUser::new("u-2")).await;

        assert!(shared.get_user(&UserId::new("u-2")).await.is_ok());
    }

    #[test]
    #[should_panic(expected = "before the directory is shared")]
    fn test_seeding_a_shared_directory_panics() {
        let directory = directory();
        let _shared = directory.clone();
        let _ = directory.with_user(DirectoryUser::new("u-2"));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let directory = directory();
        directory.fail_next_dispatch(DirectoryError::Timeout).await;

        let request = MembershipChangeRequest {
            user_id: UserId::new("u-1"),
            email: None,
            groups_to_add: vec![GroupId::new("g-admin")],
            groups_to_remove: Vec::new(),
        };
        assert_eq!(
            directory.apply_membership_delta(&request).await,
            Err(DirectoryError::Timeout)
        );
        assert!(directory.apply_membership_delta(&request).await.is_ok());
        assert_eq!(directory.applied().await.len(), 1);
    }
}
