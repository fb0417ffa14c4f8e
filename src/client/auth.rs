//! Session and password endpoints beyond login.

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use super::{send_checked, ChatClient, ClientError};

impl ChatClient {
    /// Revoke `refresh_token` on the backend and forget the tokens held here.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["logout"])?;
        debug!(%url, "Logging out");
        send_checked(self.client.post(url).bearer_auth(refresh_token)).await?;
        *self.write_credentials() = Default::default();
        info!("Logged out");
        Ok(())
    }

    /// Change the password of the logged in user.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["change-password"])?;
        debug!(%url, "Changing password");
        let body = json!({ "old_password": old_password, "new_password": new_password });
        self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    /// Ask the backend to mail a reset code to `email`.
    pub async fn reset_password_request(&self, email: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["reset-password-request"])?;
        debug!(%url, email, "Requesting password reset");
        send_checked(self.client.post(url).json(&json!({ "email": email }))).await?;
        Ok(())
    }

    /// Set a new password with a mailed reset code.
    pub async fn reset_password(
        &self,
        email: &str,
        reset_code: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["reset-password"])?;
        debug!(%url, email, "Resetting password");
        let body = json!({
            "email": email,
            "reset_code": reset_code,
            "new_password": new_password,
        });
        send_checked(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}
