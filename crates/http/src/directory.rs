//! Engine collaborator traits backed by the portal API

use crate::client::DirectoryClient;
use async_trait::async_trait;
use portal_access_core::{
    Directory, DirectoryError, DirectoryUser, Group, GroupCatalog, MembershipChangeRequest,
    UserId,
};

#[async_trait]
impl GroupCatalog for DirectoryClient {
    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        let groups = self.groups().await?;
        Ok(groups.into_iter().map(Group::from).collect())
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn get_user(&self, user_id: &UserId) -> Result<DirectoryUser, DirectoryError> {
        Ok(self.user(user_id).await?)
    }

    async fn apply_membership_delta(
        &self,
        request: &MembershipChangeRequest,
    ) -> Result<(), DirectoryError> {
        self.modify_user_access(request).await.map_err(|err| {
            tracing::warn!(user = %request.user_id, error = %err, "modify-user-access failed");
            DirectoryError::from(err)
        })
    }
}
