//! Group endpoints

use super::{ClientError, DirectoryClient};
use portal_access_core::{DirectoryGroup, MembershipChangeRequest};
use reqwest::Method;

impl DirectoryClient {
    /// List every group known to the directory
    pub async fn groups(&self) -> Result<Vec<DirectoryGroup>, ClientError> {
        let request = self.request(Method::GET, &["api", "groups"])?;
        self.execute(request).await
    }

    /// Add and remove group memberships for one user in a single call
    pub async fn modify_user_access(
        &self,
        change: &MembershipChangeRequest,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &["api", "groups", "modify-user-access"])?
            .json(change);
        self.execute_empty(request).await
    }
}
