use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::deserialize_null_default;

/// Row of the `/api/users` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHeader {
    #[serde(default)]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub roles: Vec<String>,
}

impl UserHeader {
    /// "Given Family", or the email when no name is set.
    pub fn display_name(&self) -> String {
        let name = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Full user record from `/api/users/{email}`.
///
/// Fields this client does not know are kept and sent back on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub roles: Vec<String>,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
