use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::session::SessionUser;

/// Token response from the authorization server's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Identity claims, either decoded from the access token or fetched from userinfo.
///
/// Claims beyond `sub`/`email`/`name` are kept untouched in `claims`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl UserInfo {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
            name: None,
            claims: Map::new(),
        }
    }

    /// String entries of the optional `roles` claim. Anything else counts as no roles.
    pub fn roles(&self) -> Vec<String> {
        match self.claims.get("roles") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&UserInfo> for SessionUser {
    fn from(info: &UserInfo) -> Self {
        SessionUser {
            id: info.sub.clone(),
            email: info.email.clone(),
            name: info.name.clone(),
            roles: info.roles(),
        }
    }
}
