use serde::Serialize;

use crate::services::session::{Session, SessionUser};

/// Body of `GET /auth/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl From<&Session> for AuthStatus {
    fn from(session: &Session) -> Self {
        let user = session.authenticated_user().cloned();
        Self {
            authenticated: user.is_some(),
            user,
        }
    }
}
