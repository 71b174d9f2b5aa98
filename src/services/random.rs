//! Random identifiers for the login flow.
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Bytes of entropy in an OAuth `state` value.
pub const STATE_BYTES: usize = 16;

/// Bytes of entropy in a session id.
pub const SESSION_ID_BYTES: usize = 32;

/// OAuth `state` nonce: 16 random bytes, lowercase hex (32 chars).
pub fn generate_state() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; STATE_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Opaque session id: 32 random bytes, URL-safe base64 without padding (43 chars).
pub fn generate_session_id() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
