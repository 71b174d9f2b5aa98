/*
 * Responsibility
 * - GET /auth/status (現在の session の認証状態を返すだけ。書き込みなし)
 */
use axum::Json;

use crate::api::auth::dto::status::AuthStatus;
use crate::api::extractors::CurrentSession;

pub async fn status(current: CurrentSession) -> Json<AuthStatus> {
    Json(AuthStatus::from(&current.session))
}
