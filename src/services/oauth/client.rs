use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Value, json};
use url::Url;

use crate::services::oauth::{OAuthError, OAuthProvider, TokenResponse, UserInfo};

/// Connection settings for the authorization server.
///
/// Passed explicitly to [`TokenClient::new`] so tests can point it at any endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub base_url: Url,
    pub redirect_uri: String,
    pub timeout: Duration,
    pub decode_access_token: bool,
}

impl OAuthClientConfig {
    pub fn new(base_url: Url, redirect_uri: impl Into<String>) -> Self {
        Self {
            base_url,
            redirect_uri: redirect_uri.into(),
            timeout: Duration::from_secs(10),
            decode_access_token: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_decode_access_token(mut self, enabled: bool) -> Self {
        self.decode_access_token = enabled;
        self
    }
}

/// HTTP client for the authorization server (`/oauth/{authorize,token,revoke,userinfo}`).
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    redirect_uri: String,
    decode_access_token: bool,
    authorize_url: Url,
    token_url: Url,
    revoke_url: Url,
    userinfo_url: Url,
}

impl std::fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient")
            .field("token_url", &self.token_url.as_str())
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{}{}", base.as_str().trim_end_matches('/'), path))
}

/// `****abcd`: only the last four characters of a credential ever reach the logs.
fn mask_token(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", tail)
}

// Status code + body text of a failed response. An unreadable body becomes "".
async fn failure(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

/// Read the claims of a JWT without checking its signature.
///
/// Only for tokens received directly from the token endpoint over a server-to-server call;
/// this extracts claims, it does not authenticate anything.
fn decode_claims_unverified(token: &str) -> Option<UserInfo> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data =
        jsonwebtoken::decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;

    match data.claims {
        Value::Object(_) => serde_json::from_value(data.claims).ok(),
        _ => None,
    }
}

impl TokenClient {
    pub fn new(config: OAuthClientConfig) -> Result<Self, OAuthError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Self::with_http_client(config, http)
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(
        config: OAuthClientConfig,
        http: reqwest::Client,
    ) -> Result<Self, OAuthError> {
        Ok(Self {
            authorize_url: endpoint(&config.base_url, "/oauth/authorize")?,
            token_url: endpoint(&config.base_url, "/oauth/token")?,
            revoke_url: endpoint(&config.base_url, "/oauth/revoke")?,
            userinfo_url: endpoint(&config.base_url, "/oauth/userinfo")?,
            redirect_uri: config.redirect_uri,
            decode_access_token: config.decode_access_token,
            http,
        })
    }

    async fn post_token(&self, body: &Value) -> Result<reqwest::Response, OAuthError> {
        Ok(self
            .http
            .post(self.token_url.clone())
            .json(body)
            .send()
            .await?)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure(response).await;
            return Err(OAuthError::UserInfo { status, body });
        }

        Ok(response.json::<UserInfo>().await?)
    }
}

#[async_trait]
impl OAuthProvider for TokenClient {
    fn authorization_url(&self, state: &str, redirect_path: Option<&str>) -> String {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("state", state);
            if let Some(path) = redirect_path {
                query.append_pair("redirect_path", path);
            }
        }
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let response = self
            .post_token(&json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": self.redirect_uri,
            }))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "token exchange request failed"))?;

        if !response.status().is_success() {
            let (status, body) = failure(response).await;
            tracing::error!(status, body = %body, "token exchange rejected");
            return Err(OAuthError::TokenExchange { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        let response = self
            .post_token(&json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "token refresh request failed"))?;

        if !response.status().is_success() {
            let (status, body) = failure(response).await;
            tracing::error!(status, body = %body, "token refresh rejected");
            return Err(OAuthError::TokenRefresh { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    async fn revoke(&self, token: Option<&str>) {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                tracing::debug!("no token to revoke");
                return;
            }
        };

        tracing::debug!(token = %mask_token(token), "revoking token");

        let result = self
            .http
            .post(self.revoke_url.clone())
            .json(&json!({ "refresh_token": token }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let (status, body) = failure(response).await;
                tracing::warn!(status, body = %body, "token revocation warning");
            }
            Err(e) => tracing::error!(error = %e, "error revoking token"),
        }
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        if self.decode_access_token {
            if let Some(info) = decode_claims_unverified(access_token) {
                return Ok(info);
            }
            tracing::debug!("access token is not a decodable JWT; calling userinfo endpoint");
        }

        self.fetch_user_info(access_token)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error getting user info"))
    }
}
