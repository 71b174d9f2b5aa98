//! Route guards: authentication and role checks over the loaded session.
//!
//! Guards only read the `CurrentSession` placed in extensions by `middleware::session`, so
//! that loader must wrap them. Apply them with `Router::route_layer`; the layer added last
//! runs first:
//!
//! ```ignore
//! let admin = Router::new().route("/admin", get(admin_page));
//! let admin = RoleGuard::role("admin").apply(admin);
//! let admin = guard::require_authenticated(admin);
//! ```

use axum::{
    Router,
    extract::{OriginalUri, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::api::auth::LOGIN_PATH;
use crate::api::extractors::CurrentSession;
use crate::api::response::found;
use crate::error::AppError;
use crate::services::session::Session;

/// Require a signed-in session (access token and user). Otherwise redirect the browser to the
/// login route, carrying the original path and query as `redirect`.
pub fn require_authenticated<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn(authenticated_middleware))
}

async fn authenticated_middleware(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
    next: Next,
) -> Response {
    let authenticated = req
        .extensions()
        .get::<CurrentSession>()
        .is_some_and(|current| current.session.is_authenticated());

    if authenticated {
        return next.run(req).await;
    }

    let original = original_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    found(&login_redirect_location(original))
}

/// `/auth/login?redirect=<url-encoded original>`
pub fn login_redirect_location(original: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{}?redirect={}", LOGIN_PATH, encoded)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Role(String),
    Any(Vec<String>),
    All(Vec<String>),
}

/// Reusable role predicate.
///
/// Every check answers 401 when the session has no authenticated user and 403 when the
/// user's roles do not satisfy the requirement. A user without roles has zero roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    requirement: Requirement,
}

fn collect_roles<I, R>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    roles.into_iter().map(Into::into).collect()
}

impl RoleGuard {
    /// The user must have `role`.
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            requirement: Requirement::Role(role.into()),
        }
    }

    /// The user must have at least one of `roles`.
    pub fn any<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            requirement: Requirement::Any(collect_roles(roles)),
        }
    }

    /// The user must have every one of `roles`.
    pub fn all<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            requirement: Requirement::All(collect_roles(roles)),
        }
    }

    pub fn check(&self, session: &Session) -> Result<(), AppError> {
        let user = session.authenticated_user().ok_or(AppError::Unauthorized)?;

        match &self.requirement {
            Requirement::Role(role) => {
                if user.has_role(role) {
                    Ok(())
                } else {
                    Err(AppError::forbidden(format!(
                        "Forbidden: Requires {} role",
                        role
                    )))
                }
            }
            Requirement::Any(roles) => {
                if roles.iter().any(|r| user.has_role(r)) {
                    Ok(())
                } else {
                    Err(AppError::forbidden(format!(
                        "Forbidden: Requires one of: {}",
                        roles.join(", ")
                    )))
                }
            }
            Requirement::All(roles) => {
                if roles.iter().all(|r| user.has_role(r)) {
                    Ok(())
                } else {
                    Err(AppError::forbidden(format!(
                        "Forbidden: Requires all roles: {}",
                        roles.join(", ")
                    )))
                }
            }
        }
    }

    /// Guard every route of `router` with this check.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, role_middleware))
    }
}

async fn role_middleware(State(guard): State<RoleGuard>, req: Request, next: Next) -> Response {
    let verdict = match req.extensions().get::<CurrentSession>() {
        Some(current) => guard.check(&current.session),
        None => Err(AppError::Unauthorized),
    };

    match verdict {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::debug!(error = %err, "role check rejected request");
            err.into_response()
        }
    }
}
