use async_trait::async_trait;

use crate::services::oauth::{OAuthError, TokenResponse, UserInfo};

/// Outbound operations against the authorization server.
///
/// `TokenClient` is the HTTP implementation; handlers only see this trait.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Authorization endpoint URL for `state` (pure, no I/O).
    fn authorization_url(&self, state: &str, redirect_path: Option<&str>) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError>;

    /// Best effort. Blank or absent tokens are skipped; failures are logged, never returned.
    async fn revoke(&self, token: Option<&str>);

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError>;
}
