/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - oauth: 認可サーバーへの outbound, sessions: session store, settings: cookie/redirect 設定
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::config::Config;
use crate::services::{oauth::OAuthProvider, session::SessionStore};

/// Cookie and redirect settings shared by the auth routes and the session loader.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub session_cookie_name: String,
    pub session_ttl_seconds: u64,
    pub secure_cookies: bool,
    pub login_redirect: String,
    pub logout_redirect: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_cookie_name: config.session_cookie_name.clone(),
            session_ttl_seconds: config.session_ttl_seconds,
            secure_cookies: config.secure_cookies(),
            login_redirect: config.login_redirect.clone(),
            logout_redirect: config.logout_redirect.clone(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_cookie_name: "sid".into(),
            session_ttl_seconds: 86_400,
            secure_cookies: false,
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
        }
    }
}

/// Signing key for the session cookie.
///
/// SHA-512 stretches the secret to the 64 bytes `Key` requires. Without a secret an
/// ephemeral key is generated, so sessions do not survive a restart.
pub fn cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => {
            tracing::warn!("SESSION_SECRET not set; using an ephemeral cookie signing key");
            Key::generate()
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<dyn OAuthProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: Arc<AuthSettings>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        oauth: Arc<dyn OAuthProvider>,
        sessions: Arc<dyn SessionStore>,
        settings: AuthSettings,
        cookie_key: Key,
    ) -> Self {
        Self {
            oauth,
            sessions,
            settings: Arc::new(settings),
            cookie_key,
        }
    }
}

// SignedCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
