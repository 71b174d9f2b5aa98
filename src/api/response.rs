/*
 * Responsibility
 * - ブラウザ向けの 302 Found リダイレクトと、redirect パラメータの安全性チェック
 */
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// `302 Found` to `location`.
///
/// `axum::response::Redirect` only offers 303/307/308; browsers treat all of them the same
/// for GET navigation but the login flow answers with the classic 302.
pub fn found(location: &str) -> Response {
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "redirect target is not a valid header value");
            AppError::Internal.into_response()
        }
    }
}

/// Accept only same-origin relative paths as post-login / post-logout targets.
///
/// Rejects absolute URLs, scheme-relative `//host` and `/\host` forms, and anything with
/// control characters.
pub fn safe_redirect_target(raw: &str) -> Option<&str> {
    let target = raw.trim();
    let rest = target.strip_prefix('/')?;

    if rest.starts_with('/') || rest.starts_with('\\') {
        return None;
    }
    if target.chars().any(|c| c.is_control()) {
        return None;
    }

    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_location() {
        let res = found("/projects/42");
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[header::LOCATION], "/projects/42");
    }

    #[test]
    fn found_with_invalid_header_is_internal_error() {
        let res = found("/bad\nheader");
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn relative_paths_are_safe() {
        for target in ["/", "/projects/42", "/search?q=a%20b", "/a#frag"] {
            assert_eq!(safe_redirect_target(target), Some(target), "{target}");
        }
    }

    #[test]
    fn external_targets_are_rejected() {
        for target in [
            "https://evil.example.com",
            "//evil.example.com",
            "/\\evil.example.com",
            "evil",
            "",
            "/a\r\nSet-Cookie: x=y",
        ] {
            assert_eq!(safe_redirect_target(target), None, "{target:?}");
        }
    }
}
