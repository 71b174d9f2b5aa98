/*
 * Responsibility
 * - ガード付きルートの動作確認用ページ (/, /secure, /admin)
 */
use axum::{Router, routing::get};

use crate::api::extractors::CurrentSession;
use crate::middleware::guard::{self, RoleGuard};
use crate::state::AppState;

async fn index_page() -> &'static str {
    "Hello World"
}

async fn secure_page(current: CurrentSession) -> String {
    match current.session.authenticated_user() {
        Some(user) => format!(
            "Secure Hello World, {}",
            user.name.as_deref().unwrap_or(&user.id)
        ),
        None => "Secure Hello World".to_string(),
    }
}

async fn admin_page() -> &'static str {
    "Admin Hello World"
}

pub fn routes() -> Router<AppState> {
    let public = Router::<AppState>::new().route("/", get(index_page));

    let secure = Router::<AppState>::new().route("/secure", get(secure_page));
    let secure = guard::require_authenticated(secure);

    // role check first, then authentication wraps it (outermost runs first)
    let admin = Router::<AppState>::new().route("/admin", get(admin_page));
    let admin = RoleGuard::role("admin").apply(admin);
    let admin = guard::require_authenticated(admin);

    public.merge(secure).merge(admin)
}
