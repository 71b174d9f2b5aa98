//! Session loading: signed session cookie → SessionStore → `CurrentSession` in extensions.
//!
//! Runs once per request before the auth routes and the guards. Loading never writes; a
//! missing, forged or expired cookie, or an unreachable store, just yields an anonymous
//! session.

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use axum_extra::extract::SignedCookieJar;

use crate::api::extractors::CurrentSession;
use crate::services::session::SessionId;
use crate::state::AppState;

/// Attach the session loader to every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, session_middleware))
}

async fn session_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let current = load_current_session(&state, &jar).await;

    // middleware → extractor / guard への受け渡し
    req.extensions_mut().insert(current);

    next.run(req).await
}

/// Resolve the session referenced by the signed cookie in `jar`.
///
/// A store read failure is logged and treated as anonymous: guards then deny access, and
/// logout can still clear the cookie and redirect.
pub async fn load_current_session(state: &AppState, jar: &SignedCookieJar) -> CurrentSession {
    // SignedCookieJar drops cookies whose signature does not verify
    let Some(cookie) = jar.get(&state.settings.session_cookie_name) else {
        return CurrentSession::anonymous();
    };

    let id = SessionId::new(cookie.value());
    match state.sessions.load(&id).await {
        Ok(Some(session)) => CurrentSession::new(id, session),
        Ok(None) => {
            tracing::debug!("session cookie refers to an expired or unknown session");
            CurrentSession::anonymous()
        }
        Err(e) => {
            tracing::warn!(error = %e, "session load failed; continuing as anonymous");
            CurrentSession::anonymous()
        }
    }
}
