pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{OAuthClientConfig, TokenClient};
pub use error::OAuthError;
pub use provider::OAuthProvider;
pub use types::{TokenResponse, UserInfo};
