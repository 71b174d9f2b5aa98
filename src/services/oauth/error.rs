use thiserror::Error;

/// Failures talking to the authorization server.
///
/// Non-2xx replies carry the upstream status and body text.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token exchange failed: {status} - {body}")]
    TokenExchange { status: u16, body: String },

    #[error("token refresh failed: {status} - {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("failed to get user info: {status} - {body}")]
    UserInfo { status: u16, body: String },

    #[error("invalid authorization server endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl OAuthError {
    /// Upstream HTTP status, when the server answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::TokenExchange { status, .. }
            | Self::TokenRefresh { status, .. }
            | Self::UserInfo { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidEndpoint(_) => None,
        }
    }
}
