//! Edit session for one user's access.
//!
//! A session snapshots the user and the group catalog, lets the caller edit
//! a proposed [`AccessSet`], and submits the difference as a single
//! membership change. A failed submit leaves the proposal untouched so it can
//! be retried; a successful one closes the session.

use crate::access::{AccessSet, FormOptions, PendingForm};
use crate::catalog::{Catalog, GroupCatalog, RoleClassifier};
use crate::codec::GroupNameCodec;
use crate::diff::{MembershipDelta, ResolvedDelta, UnresolvedAtom, diff, resolve};
use crate::directory::{Directory, MembershipChangeRequest};
use crate::error::{AccessError, Result};
use crate::summary::{Summary, summarize};
use crate::types::{DirectoryUser, UserId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Editing,
    Submitted,
}

/// What a submit would do right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub delta: MembershipDelta,
    pub resolved: ResolvedDelta,
    pub summary: Summary,
    pub message: String,
}

/// Outcome of a successful submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    /// The request sent, or `None` when there was nothing to send
    pub request: Option<MembershipChangeRequest>,
    pub unresolved: Vec<UnresolvedAtom>,
    pub message: String,
}

impl SubmitReport {
    #[must_use]
    pub const fn dispatched(&self) -> bool {
        self.request.is_some()
    }
}

pub struct EditSession {
    directory: Arc<dyn Directory>,
    user: DirectoryUser,
    catalog: Catalog,
    known_roles: BTreeSet<String>,
    codec: GroupNameCodec,
    initial: AccessSet,
    proposed: AccessSet,
    state: SessionState,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("user", &self.user.id)
            .field("catalog", &self.catalog.len())
            .field("initial", &self.initial)
            .field("proposed", &self.proposed)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Load the user and the catalog concurrently and seed the proposal with
    /// the user's current access.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Load`] if either fetch fails.
    pub async fn open(
        directory: Arc<dyn Directory>,
        catalog_source: &dyn GroupCatalog,
        user_id: &UserId,
        classifier: &dyn RoleClassifier,
        codec: GroupNameCodec,
    ) -> Result<Self> {
        let (user, catalog) = tokio::try_join!(
            directory.get_user(user_id),
            Catalog::load(catalog_source)
        )
        .map_err(|err| {
            tracing::warn!(user = %user_id, error = %err, "Failed to open edit session");
            AccessError::Load(err)
        })?;

        let known_roles = catalog.role_names(classifier);
        let initial = AccessSet::build(user.group_names(), &known_roles, &codec);
        tracing::info!(
            user = %user.id,
            roles = initial.roles().len(),
            countries = initial.grants().len(),
            unrecognized = initial.unrecognized().len(),
            "Opened edit session"
        );

        Ok(Self {
            directory,
            user,
            catalog,
            known_roles,
            codec,
            proposed: initial.clone(),
            initial,
            state: SessionState::Editing,
        })
    }

    #[must_use]
    pub const fn user(&self) -> &DirectoryUser {
        &self.user
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Role names present in the catalog
    #[must_use]
    pub const fn known_roles(&self) -> &BTreeSet<String> {
        &self.known_roles
    }

    #[must_use]
    pub const fn initial(&self) -> &AccessSet {
        &self.initial
    }

    #[must_use]
    pub const fn proposed(&self) -> &AccessSet {
        &self.proposed
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Address used in the confirmation message and the change request
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.user.resolved_email()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Editing => Ok(()),
            SessionState::Submitted => Err(AccessError::SessionClosed),
        }
    }

    /// Grant `dataset` in `country`. Returns whether the grant is new.
    pub fn add_grant(&mut self, country: &str, dataset: &str) -> Result<bool> {
        self.ensure_open()?;
        self.codec.validate_component(country)?;
        self.codec.validate_component(dataset)?;
        Ok(self.proposed.add_grant(country, dataset))
    }

    pub fn remove_grant(&mut self, country: &str, dataset: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.proposed.remove_grant(country, dataset))
    }

    pub fn remove_country(&mut self, country: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.proposed.remove_country(country))
    }

    pub fn set_roles<I, S>(&mut self, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open()?;
        self.proposed.set_roles(roles);
        Ok(())
    }

    pub fn add_role(&mut self, role: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.proposed.add_role(role))
    }

    pub fn remove_role(&mut self, role: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.proposed.remove_role(role))
    }

    /// A form seeded from the current proposal. Access the user held when
    /// the session opened is exempt from the option lists.
    #[must_use]
    pub fn form(&self) -> PendingForm {
        PendingForm::from_access_set(&self.proposed).with_held(&self.initial)
    }

    /// Replace the proposal with the merged contents of `form`.
    ///
    /// Nothing changes if the form is invalid.
    pub fn apply_form(&mut self, form: &PendingForm, options: &FormOptions) -> Result<()> {
        self.ensure_open()?;
        self.proposed = form.to_access_set(options)?;
        Ok(())
    }

    /// Discard every edit
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.proposed = self.initial.clone();
        Ok(())
    }

    #[must_use]
    pub fn preview(&self) -> Preview {
        let delta = diff(&self.initial, &self.proposed);
        let resolved = resolve(&delta, &self.catalog, &self.codec);
        let summary = summarize(delta.added_grants());
        let message = summary.confirmation_message(&self.display_email());
        Preview {
            delta,
            resolved,
            summary,
            message,
        }
    }

    fn display_email(&self) -> String {
        self.email().unwrap_or_else(|| {
            if self.user.user_principal_name.is_empty() {
                self.user.id.to_string()
            } else {
                self.user.user_principal_name.clone()
            }
        })
    }

    /// Send the resolved delta as one membership change.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::SessionClosed`] after a successful submit and
    /// [`AccessError::Dispatch`] if the directory refuses the change, in
    /// which case the proposal is kept and the call may be repeated.
    pub async fn submit(&mut self) -> Result<SubmitReport> {
        self.ensure_open()?;
        let Preview {
            resolved, message, ..
        } = self.preview();

        if resolved.is_noop() {
            tracing::info!(
                user = %self.user.id,
                unresolved = resolved.unresolved.len(),
                "Nothing to submit"
            );
            self.state = SessionState::Submitted;
            return Ok(SubmitReport {
                request: None,
                unresolved: resolved.unresolved,
                message,
            });
        }

        let request = MembershipChangeRequest {
            user_id: self.user.id.clone(),
            email: self.email(),
            groups_to_add: resolved.groups_to_add,
            groups_to_remove: resolved.groups_to_remove,
        };

        if let Err(err) = self.directory.apply_membership_delta(&request).await {
            tracing::warn!(user = %self.user.id, error = %err, "Membership dispatch failed");
            return Err(AccessError::Dispatch(err));
        }

        tracing::info!(
            user = %self.user.id,
            added = request.groups_to_add.len(),
            removed = request.groups_to_remove.len(),
            "Submitted membership change"
        );
        self.state = SessionState::Submitted;
        Ok(SubmitReport {
            request: Some(request),
            unresolved: resolved.unresolved,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KnownRoles;
    use crate::catalog::mock::MockGroupCatalog;
    use crate::directory::DirectoryError;
    use crate::directory::mock::MockDirectory;
    use crate::tests::InMemoryDirectory;
    use crate::types::{DirectoryGroup, Group, GroupId};

    fn catalog_groups() -> Vec<Group> {
        vec![
            Group::new("g-admin", "Admin"),
            Group::new("g-dev", "Developer"),
            Group::new("g-ke-qos", "Kenya-School QoS"),
            Group::new("g-ke-cov", "Kenya-School Coverage"),
            Group::new("g-gh-cov", "Ghana-School Coverage"),
            Group::new("g-legacy", "Legacy Reviewers"),
        ]
    }

    fn member(id: &str, name: &str) -> DirectoryGroup {
        DirectoryGroup {
            id: GroupId::new(id),
            display_name: name.to_string(),
            description: None,
            mail: None,
        }
    }

    fn jane() -> DirectoryUser {
        DirectoryUser {
            mail: Some("jane@example.com".to_string()),
            member_of: vec![
                member("g-admin", "Admin"),
                member("g-ke-qos", "Kenya-School QoS"),
                member("g-legacy", "Legacy Reviewers"),
            ],
            ..DirectoryUser::new("u-1")
        }
    }

    fn roles() -> KnownRoles {
        KnownRoles::new(["Admin", "Developer", "Regular", "Super"])
    }

    async fn open(directory: &InMemoryDirectory) -> EditSession {
        EditSession::open(
            Arc::new(directory.clone()),
            directory,
            &UserId::new("u-1"),
            &roles(),
            GroupNameCodec::default(),
        )
        .await
        .unwrap()
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new(catalog_groups()).with_user(jane())
    }

    #[tokio::test]
    async fn test_open_builds_initial_access() {
        let directory = directory();
        let session = open(&directory).await;

        assert!(session.initial().has_role("Admin"));
        assert!(session.initial().has_grant("Kenya", "School QoS"));
        assert!(session.initial().unrecognized().contains("Legacy Reviewers"));
        assert_eq!(session.initial(), session.proposed());
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.preview().delta.is_empty());
    }

    #[tokio::test]
    async fn test_open_maps_load_failure() {
        let mut mock_directory = MockDirectory::new();
        mock_directory
            .expect_get_user()
            .returning(|_| Err(DirectoryError::NotFound("u-404".to_string())));
        let mut catalog = MockGroupCatalog::new();
        catalog.expect_list_groups().returning(|| Ok(catalog_groups()));

        let err = EditSession::open(
            Arc::new(mock_directory),
            &catalog,
            &UserId::new("u-404"),
            &roles(),
            GroupNameCodec::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            AccessError::Load(DirectoryError::NotFound("u-404".to_string()))
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_add_grant_rejects_separator() {
        let directory = directory();
        let mut session = open(&directory).await;

        let err = session.add_grant("Guinea-Bissau", "School QoS").unwrap_err();
        assert!(matches!(err, AccessError::ReservedSeparator { .. }));
        assert_eq!(session.initial(), session.proposed());
    }

    #[tokio::test]
    async fn test_preview_message_and_resolution() {
        let directory = directory();
        let mut session = open(&directory).await;

        session.add_grant("Ghana", "School Coverage").unwrap();
        session.add_grant("Kenya", "School Coverage").unwrap();
        session.add_role("Developer").unwrap();

        let preview = session.preview();
        assert_eq!(
            preview.message,
            "This will give the user with email jane@example.com access to Giga data for \
             School Coverage dataset across 2 countries: Ghana and Kenya."
        );
        assert_eq!(
            preview.resolved.groups_to_add,
            vec![
                GroupId::new("g-gh-cov"),
                GroupId::new("g-ke-cov"),
                GroupId::new("g-dev"),
            ]
        );
        assert!(preview.resolved.groups_to_remove.is_empty());
    }

    #[tokio::test]
    async fn test_submit_applies_single_change() {
        let directory = directory();
        let mut session = open(&directory).await;

        session.remove_grant("Kenya", "School QoS").unwrap();
        session.add_grant("Kenya", "School Coverage").unwrap();
        session.set_roles(["Developer"]).unwrap();

        let report = session.submit().await.unwrap();
        assert!(report.dispatched());
        assert!(report.unresolved.is_empty());

        let applied = directory.applied().await;
        assert_eq!(applied.len(), 1);
        let request = &applied[0];
        assert_eq!(request.user_id, UserId::new("u-1"));
        assert_eq!(request.email.as_deref(), Some("jane@example.com"));
        assert_eq!(
            request.groups_to_add,
            vec![GroupId::new("g-ke-cov"), GroupId::new("g-dev")]
        );
        assert_eq!(
            request.groups_to_remove,
            vec![GroupId::new("g-ke-qos"), GroupId::new("g-admin")]
        );

        let user = directory.user(&UserId::new("u-1")).await.unwrap();
        let mut names = user.group_names();
        names.sort();
        assert_eq!(
            names,
            vec!["Developer", "Kenya-School Coverage", "Legacy Reviewers"]
        );
    }

    #[tokio::test]
    async fn test_submit_closes_session() {
        let directory = directory();
        let mut session = open(&directory).await;
        session.add_role("Developer").unwrap();
        session.submit().await.unwrap();

        assert_eq!(session.state(), SessionState::Submitted);
        assert_eq!(session.add_role("Super"), Err(AccessError::SessionClosed));
        assert_eq!(session.submit().await.unwrap_err(), AccessError::SessionClosed);
        assert_eq!(directory.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_keeps_proposal_for_retry() {
        let directory = directory();
        let mut session = open(&directory).await;
        session.add_grant("Ghana", "School Coverage").unwrap();
        let proposed = session.proposed().clone();

        directory
            .fail_next_dispatch(DirectoryError::rejected(500, "boom"))
            .await;
        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, AccessError::Dispatch(DirectoryError::Rejected { status: 500, .. })));
        assert_eq!(session.proposed(), &proposed);
        assert_eq!(session.state(), SessionState::Editing);
        assert!(directory.applied().await.is_empty());

        let report = session.submit().await.unwrap();
        assert!(report.dispatched());
        assert_eq!(directory.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_session_skips_dispatch() {
        let mut mock_directory = MockDirectory::new();
        mock_directory.expect_get_user().returning(|_| Ok(jane()));
        mock_directory.expect_apply_membership_delta().never();
        let mut catalog = MockGroupCatalog::new();
        catalog.expect_list_groups().returning(|| Ok(catalog_groups()));

        let mut session = EditSession::open(
            Arc::new(mock_directory),
            &catalog,
            &UserId::new("u-1"),
            &roles(),
            GroupNameCodec::default(),
        )
        .await
        .unwrap();

        let report = session.submit().await.unwrap();
        assert!(!report.dispatched());
        assert_eq!(
            report.message,
            "This will update the access of the user with email jane@example.com."
        );
    }

    #[tokio::test]
    async fn test_unresolved_grant_is_reported_not_sent() {
        let directory = directory();
        let mut session = open(&directory).await;
        session.add_grant("Ghana", "School QoS").unwrap();
        session.add_role("Developer").unwrap();

        let report = session.submit().await.unwrap();
        let request = report.request.unwrap();
        assert_eq!(request.groups_to_add, vec![GroupId::new("g-dev")]);
        assert_eq!(report.unresolved.len(), 1);
        assert!(report.unresolved[0].to_string().contains("Ghana-School QoS"));
    }

    #[tokio::test]
    async fn test_apply_form_merges_rows_and_keeps_unrecognized() {
        let directory = directory();
        let mut session = open(&directory).await;

        let mut form = session.form();
        form.push_row(crate::access::CountryRow::new("Ghana", ["School Coverage"]));
        form.push_row(crate::access::CountryRow::new("Kenya", ["School Coverage"]));
        let options = FormOptions {
            roles: session.known_roles().clone(),
            ..FormOptions::default()
        };
        session.apply_form(&form, &options).unwrap();

        assert!(session.proposed().has_grant("Kenya", "School QoS"));
        assert!(session.proposed().has_grant("Kenya", "School Coverage"));
        assert!(session.proposed().has_grant("Ghana", "School Coverage"));
        assert!(session.proposed().unrecognized().contains("Legacy Reviewers"));

        let preview = session.preview();
        assert_eq!(preview.delta.to_add.len(), 2);
        assert!(preview.delta.to_remove.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_leaves_proposal() {
        let directory = directory();
        let mut session = open(&directory).await;

        let mut form = session.form();
        form.set_roles(Vec::<String>::new());
        let err = session
            .apply_form(&form, &FormOptions::default())
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidForm(_)));
        assert_eq!(session.initial(), session.proposed());
    }

    #[tokio::test]
    async fn test_reset_discards_edits() {
        let directory = directory();
        let mut session = open(&directory).await;
        session.remove_role("Admin").unwrap();
        session.remove_country("Kenya").unwrap();
        assert!(!session.preview().delta.is_empty());

        session.reset().unwrap();
        assert!(session.preview().delta.is_empty());
    }
}
