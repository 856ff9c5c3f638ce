//! User endpoints

use super::{ClientError, DirectoryClient};
use portal_access_core::{DirectoryUser, UserId, UserUpdate};
use reqwest::Method;

impl DirectoryClient {
    /// List directory users. Memberships may be omitted by the server.
    pub async fn users(&self) -> Result<Vec<DirectoryUser>, ClientError> {
        let request = self.request(Method::GET, &["api", "users"])?;
        self.execute(request).await
    }

    /// Fetch one user with their group memberships
    pub async fn user(&self, user_id: &UserId) -> Result<DirectoryUser, ClientError> {
        let request = self.request(Method::GET, &["api", "users", user_id.as_str()])?;
        self.execute(request).await
    }

    /// Apply a partial profile update, such as enabling sign-in
    pub async fn edit_user(&self, user_id: &UserId, update: &UserUpdate) -> Result<(), ClientError> {
        let request = self
            .request(Method::PATCH, &["api", "users", user_id.as_str()])?
            .json(update);
        self.execute_empty(request).await
    }
}
