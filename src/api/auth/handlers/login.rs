/*
 * Responsibility
 * - GET /auth/login
 * - state nonce を生成して session に保存 (保存完了を待ってから) → 認可サーバーへ 302
 */
use axum::{
    extract::{Query, State},
    response::Response,
};
use axum_extra::extract::SignedCookieJar;

use crate::api::auth::{cookies, dto::query::RedirectQuery};
use crate::api::extractors::CurrentSession;
use crate::api::response::{found, safe_redirect_target};
use crate::error::AppError;
use crate::services::random;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    current: CurrentSession,
    Query(query): Query<RedirectQuery>,
) -> Result<(SignedCookieJar, Response), AppError> {
    let oauth_state = random::generate_state().map_err(|e| {
        tracing::error!(error = %e, "failed to generate oauth state");
        AppError::Internal
    })?;

    let redirect = match query.redirect.as_deref() {
        Some(raw) => {
            let safe = safe_redirect_target(raw).map(str::to_string);
            if safe.is_none() {
                tracing::warn!(redirect = %raw, "ignoring unsafe post-login redirect");
            }
            safe
        }
        None => None,
    };

    let session = current
        .session
        .with_login_pending(oauth_state.clone(), redirect);

    // The state must be persisted before the browser can reach the callback
    let jar = match current.id {
        Some(id) => {
            state.sessions.save(&id, &session).await?;
            jar
        }
        None => {
            let id = state.sessions.create(&session).await?;
            jar.add(cookies::session_cookie(&state.settings, &id))
        }
    };

    tracing::debug!("login initiated; redirecting to authorization server");

    let auth_url = state.oauth.authorization_url(&oauth_state, None);
    Ok((jar, found(&auth_url)))
}
