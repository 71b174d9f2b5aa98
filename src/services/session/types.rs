/*
 * Responsibility
 * - サーバー側 session レコードの型 (Session / SessionUser / SessionId)
 * - 状態遷移は値を作り直すメソッドで表現する (anonymous → login-pending → authenticated)
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque session identifier (the value of the signed session cookie).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the signed-in user, copied from userinfo claims at callback time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    // Absent upstream or in older records means "no roles", never "any role".
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SessionUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Server-side session record.
///
/// `user` and `access_token` are only ever set together through [`Session::authenticated`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_login_redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl Session {
    /// A session is authenticated iff it holds both an access token and a user.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    /// The user, but only when the session is authenticated.
    pub fn authenticated_user(&self) -> Option<&SessionUser> {
        if self.access_token.is_some() {
            self.user.as_ref()
        } else {
            None
        }
    }

    /// anonymous → login-pending. A missing redirect keeps any previously stored one.
    pub fn with_login_pending(mut self, state: String, redirect: Option<String>) -> Self {
        self.oauth_state = Some(state);
        if redirect.is_some() {
            self.post_login_redirect = redirect;
        }
        self
    }

    /// Consume the stored state nonce. The returned session never carries it.
    pub fn take_oauth_state(mut self) -> (Self, Option<String>) {
        let state = self.oauth_state.take();
        (self, state)
    }

    /// login-pending → authenticated. Returns the session and the post-login redirect, which
    /// is cleared from the record.
    pub fn authenticated(
        mut self,
        access_token: String,
        refresh_token: Option<String>,
        user: SessionUser,
    ) -> (Self, Option<String>) {
        self.oauth_state = None;
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        self.user = Some(user);
        let redirect = self.post_login_redirect.take();
        (self, redirect)
    }
}
