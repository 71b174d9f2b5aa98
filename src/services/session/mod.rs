pub mod store;
pub mod types;

pub use store::{CacheSessionStore, SessionError, SessionStore};
pub use types::{Session, SessionId, SessionUser};
