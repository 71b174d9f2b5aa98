use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::services::session::SessionId;
use crate::state::AuthSettings;

/// Session cookie: HttpOnly, SameSite=Lax, Path=/, Max-Age = session TTL, Secure in production.
pub(crate) fn session_cookie(settings: &AuthSettings, id: &SessionId) -> Cookie<'static> {
    Cookie::build((settings.session_cookie_name.clone(), id.to_string()))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(settings.session_ttl_seconds as i64))
        .build()
}

/// Removal cookie for the session (must match name and path of the original).
pub(crate) fn clear_session_cookie(settings: &AuthSettings) -> Cookie<'static> {
    Cookie::build((settings.session_cookie_name.clone(), ""))
        .path("/")
        .build()
}
