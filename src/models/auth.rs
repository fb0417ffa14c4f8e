use serde::{Deserialize, Serialize};

/// Token pair issued by `/api/login` and `/api/token-refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}
