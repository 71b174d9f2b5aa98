/*
 * Responsibility
 * - GET /auth/callback
 * - code/state の検証 → state を消費して保存 → token 交換 → userinfo → session を認証済みに
 * - state は比較の直後に消す (成功・失敗どちらでも、ネットワーク呼び出しより前に)
 */
use axum::{
    extract::{Query, State},
    response::Response,
};

use crate::api::auth::dto::query::CallbackQuery;
use crate::api::extractors::CurrentSession;
use crate::api::response::found;
use crate::error::AppError;
use crate::services::session::SessionUser;
use crate::state::AppState;

pub async fn callback(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let code = CallbackQuery::param(query.code);
    let received_state = CallbackQuery::param(query.state);
    let denied = CallbackQuery::param(query.error);

    if denied.is_none() && code.is_none() {
        return Err(AppError::bad_request("Missing authorization code"));
    }
    let received_state =
        received_state.ok_or_else(|| AppError::bad_request("Missing state parameter"))?;

    let invalid_state = || AppError::forbidden("Invalid state parameter - possible CSRF attack");

    let Some(id) = current.id else {
        tracing::warn!("oauth callback without a session");
        return Err(invalid_state());
    };

    let (session, stored_state) = current.session.take_oauth_state();
    let Some(stored_state) = stored_state else {
        tracing::warn!("oauth callback without a pending login");
        return Err(invalid_state());
    };

    // Single use: persist the cleared state before comparing or calling out
    let consumed = state.sessions.save(&id, &session).await;

    if received_state != stored_state {
        if let Err(e) = consumed {
            tracing::error!(error = %e, "failed to clear oauth state after mismatch");
        }
        tracing::warn!("oauth state mismatch");
        return Err(invalid_state());
    }
    consumed?;

    if let Some(error) = denied {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or(""),
            "authorization server returned an error"
        );
        return Err(AppError::bad_request(format!("Authorization failed: {}", error)));
    }
    let code = code.ok_or_else(|| AppError::bad_request("Missing authorization code"))?;

    let tokens = state.oauth.exchange_code(&code).await?;
    let info = state.oauth.user_info(&tokens.access_token).await?;
    let user = SessionUser::from(&info);

    let (session, redirect) = session.authenticated(tokens.access_token, tokens.refresh_token, user);
    state.sessions.save(&id, &session).await?;

    tracing::info!(user_id = %info.sub, "oauth login successful");

    let target = redirect.unwrap_or_else(|| state.settings.login_redirect.clone());
    Ok(found(&target))
}
