/*
 * Responsibility
 * - Handler / guard から見える「このリクエストの session」の型
 * - middleware::session が cookie → store から読み込んで request extensions に格納する
 *
 * Notes
 * - Session 自体は値。書き換えたいときは新しい値を作って SessionStore::save する
 */
use crate::services::session::{Session, SessionId};

/// Session attached to the current request.
///
/// `id` is `None` when the browser has no (valid) session cookie or the record expired; the
/// first write then creates a new record.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub session: Session,
}

impl CurrentSession {
    pub fn new(id: SessionId, session: Session) -> Self {
        Self {
            id: Some(id),
            session,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
