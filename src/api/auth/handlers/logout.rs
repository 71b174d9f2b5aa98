/*
 * Responsibility
 * - GET /auth/logout
 * - token revoke (best effort) → session 破棄 → cookie 削除 → 常に 302
 */
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};
use axum_extra::extract::SignedCookieJar;

use crate::api::auth::{cookies, dto::query::RedirectQuery};
use crate::api::extractors::CurrentSession;
use crate::api::response::{found, safe_redirect_target};
use crate::state::AppState;

pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    current: CurrentSession,
    query: Result<Query<RedirectQuery>, QueryRejection>,
) -> (SignedCookieJar, Response) {
    let query = query.map(|Query(q)| q).unwrap_or_default();

    // Revocation never fails the logout
    state
        .oauth
        .revoke(current.session.access_token.as_deref())
        .await;
    state
        .oauth
        .revoke(current.session.refresh_token.as_deref())
        .await;

    let target = query
        .redirect
        .as_deref()
        .and_then(safe_redirect_target)
        .unwrap_or(&state.settings.logout_redirect)
        .to_string();

    if let Some(id) = &current.id {
        if let Err(e) = state.sessions.destroy(id).await {
            tracing::error!(error = %e, "error destroying session");
        }
    }

    let jar = jar.remove(cookies::clear_session_cookie(&state.settings));
    (jar, found(&target))
}
