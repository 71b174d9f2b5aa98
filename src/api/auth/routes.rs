/*
 * Responsibility
 * - /auth 配下の URL 構造を定義 (login / callback / logout / status)
 */
use axum::{Router, routing::get};

use crate::api::auth::handlers::{
    callback::callback, login::login, logout::logout, status::status,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/status", get(status))
}
