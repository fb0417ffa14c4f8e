//! User administration: `/api/users`. Needs the `admin` role.

use reqwest::Method;
use tracing::debug;

use super::{read_json, read_verdict, ChatClient, ClientError};
use crate::models::{User, UserHeader};

const USERS: &str = "users";

impl ChatClient {
    pub async fn users_list(&self) -> Result<Vec<UserHeader>, ClientError> {
        self.get_json(&[USERS]).await
    }

    /// A user by email.
    pub async fn user_get(&self, email: &str) -> Result<User, ClientError> {
        self.get_json(&[USERS, email]).await
    }

    /// Replace the stored record of `email`.
    pub async fn user_update(&self, email: &str, user: &User) -> Result<User, ClientError> {
        let url = self.endpoint(&[USERS, email])?;
        debug!(%url, "Updating user");
        let response = self.send(self.request(Method::PUT, url).json(user)).await?;
        read_json(response).await
    }

    /// Delete a user. Returns the backend's verdict; an empty body counts as success.
    pub async fn user_delete(&self, email: &str) -> Result<bool, ClientError> {
        let url = self.endpoint(&[USERS, email])?;
        debug!(%url, "Deleting user");
        let response = self.send(self.request(Method::DELETE, url)).await?;
        read_verdict(response).await
    }
}
