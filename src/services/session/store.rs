use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::services::{
    cache::{CacheClient, CacheError, client::ttl_seconds},
    random,
    session::types::{Session, SessionId},
};

/// How many fresh ids `create` tries before giving up.
const CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("session encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("random generator failure: {0}")]
    Random(getrandom::Error),

    #[error("could not allocate a unique session id")]
    IdExhausted,
}

/// Durable mapping from session id to [`Session`].
///
/// The flow treats sessions as values: `load` a copy, build the next value, `save` it back.
/// Every `save` refreshes the TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, SessionError>;

    /// Overwrite the record. The write is confirmed before this returns.
    async fn save(&self, id: &SessionId, session: &Session) -> Result<(), SessionError>;

    /// Persist a new record under a freshly generated id.
    async fn create(&self, session: &Session) -> Result<SessionId, SessionError>;

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}

/// Session store on top of any [`CacheClient`] (Valkey in production, memory in dev/tests).
#[derive(Clone)]
pub struct CacheSessionStore<C: CacheClient> {
    cache: Arc<C>,
    // Key prefix to avoid collisions with other users of the same cache
    prefix: String,
    ttl: Duration,
}

impl<C: CacheClient> CacheSessionStore<C> {
    pub fn new(cache: Arc<C>, ttl_secs: u64) -> Self {
        Self::new_with_prefix(cache, "session", ttl_secs)
    }

    pub fn new_with_prefix(cache: Arc<C>, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl: ttl_seconds(ttl_secs),
        }
    }

    pub fn key(&self, id: &SessionId) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

#[async_trait]
impl<C: CacheClient> SessionStore for CacheSessionStore<C> {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, SessionError> {
        let raw = match self.cache.get_string(&self.key(id)).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // An unreadable record behaves like an expired one
                tracing::warn!(
                    backend = self.cache.backend_name(),
                    error = %e,
                    "discarding unreadable session record"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, id: &SessionId, session: &Session) -> Result<(), SessionError> {
        let raw = serde_json::to_string(session)?;
        self.cache.set_with_ttl(&self.key(id), &raw, self.ttl).await?;
        Ok(())
    }

    async fn create(&self, session: &Session) -> Result<SessionId, SessionError> {
        let raw = serde_json::to_string(session)?;

        for _ in 0..CREATE_ATTEMPTS {
            let id = SessionId::new(random::generate_session_id().map_err(SessionError::Random)?);
            // SET NX so an id is never handed out twice
            if self
                .cache
                .set_if_absent_with_ttl(&self.key(&id), &raw, self.ttl)
                .await?
            {
                tracing::debug!(backend = self.cache.backend_name(), "session created");
                return Ok(id);
            }
        }

        Err(SessionError::IdExhausted)
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.cache.del(&self.key(id)).await?;
        Ok(())
    }
}
