use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use axum_extra::extract::{SignedCookieJar, cookie::Key};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use crate::app::build_router;
use crate::services::cache::{CacheError, MemoryClient};
use crate::services::oauth::{OAuthError, OAuthProvider, TokenResponse, UserInfo};
use crate::services::session::{
    CacheSessionStore, Session, SessionError, SessionId, SessionStore,
};
use crate::state::{AppState, AuthSettings};

const AUTHORIZE_URL: &str = "https://auth.example.com/oauth/authorize";

/// Authorization server double that records every outbound call.
#[derive(Default)]
struct FakeProvider {
    roles: Vec<String>,
    fail_exchange: bool,
    fail_user_info: bool,
    exchanged: Mutex<Vec<String>>,
    revoked: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn with_roles(roles: &[&str]) -> Self {
        Self {
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    fn exchanged(&self) -> Vec<String> {
        self.exchanged.lock().unwrap().clone()
    }

    fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn authorization_url(&self, state: &str, _redirect_path: Option<&str>) -> String {
        format!("{AUTHORIZE_URL}?response_type=code&state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        self.exchanged.lock().unwrap().push(code.to_string());
        if self.fail_exchange {
            return Err(OAuthError::TokenExchange {
                status: 400,
                body: "invalid_grant".into(),
            });
        }
        Ok(TokenResponse {
            access_token: format!("access-{code}"),
            refresh_token: Some(format!("refresh-{code}")),
            expires_in: Some(3600),
            token_type: Some("Bearer".into()),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        Err(OAuthError::TokenRefresh {
            status: 400,
            body: "unsupported".into(),
        })
    }

    async fn revoke(&self, token: Option<&str>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.revoked.lock().unwrap().push(token.to_string());
        }
    }

    async fn user_info(&self, _access_token: &str) -> Result<UserInfo, OAuthError> {
        if self.fail_user_info {
            return Err(OAuthError::UserInfo {
                status: 401,
                body: "invalid_token".into(),
            });
        }
        let mut info = UserInfo::new("user-1");
        info.email = Some("user@example.com".into());
        info.name = Some("Test User".into());
        info.claims.insert("roles".into(), json!(self.roles));
        Ok(info)
    }
}

/// Session store whose backend is unreachable: every operation fails.
struct UnavailableStore;

fn unavailable() -> SessionError {
    SessionError::Cache(CacheError::BackendConnection("connection refused".into()))
}

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn load(&self, _id: &SessionId) -> Result<Option<Session>, SessionError> {
        Err(unavailable())
    }

    async fn save(&self, _id: &SessionId, _session: &Session) -> Result<(), SessionError> {
        Err(unavailable())
    }

    async fn create(&self, _session: &Session) -> Result<SessionId, SessionError> {
        Err(unavailable())
    }

    async fn destroy(&self, _id: &SessionId) -> Result<(), SessionError> {
        Err(unavailable())
    }
}

/// Router over [`UnavailableStore`], signing cookies with `key`.
fn unavailable_app(key: Key) -> Router {
    build_router(AppState::new(
        Arc::new(FakeProvider::default()),
        Arc::new(UnavailableStore),
        AuthSettings::default(),
        key,
    ))
}

async fn send(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

struct Harness {
    app: Router,
    provider: Arc<FakeProvider>,
    store: Arc<CacheSessionStore<MemoryClient>>,
    key: Key,
}

impl Harness {
    fn new(provider: FakeProvider) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(CacheSessionStore::new(Arc::new(MemoryClient::new()), 3600));
        let key = Key::generate();
        let state = AppState::new(
            provider.clone(),
            store.clone(),
            AuthSettings::default(),
            key.clone(),
        );
        Self {
            app: build_router(state),
            provider,
            store,
            key,
        }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        send(&self.app, uri, cookie).await
    }

    fn session_id(&self, cookie: &str) -> SessionId {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        let jar = SignedCookieJar::from_headers(&headers, self.key.clone());
        SessionId::new(jar.get("sid").expect("signed sid cookie").value())
    }

    async fn stored(&self, cookie: &str) -> Option<Session> {
        self.store.load(&self.session_id(cookie)).await.unwrap()
    }

    /// GET `uri` (a login URL) and return the session cookie and the issued state.
    async fn start_login(&self, uri: &str) -> (String, String) {
        let res = self.get(uri, None).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        let cookie = session_cookie(&res).expect("login sets the session cookie");
        let state = state_param(&location(&res));
        (cookie, state)
    }

    /// Full login; returns the cookie of the authenticated session.
    async fn sign_in(&self) -> String {
        let (cookie, state) = self.start_login("/auth/login").await;
        let res = self
            .get(
                &format!("/auth/callback?code=abc&state={state}"),
                Some(&cookie),
            )
            .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        cookie
    }
}

fn location(res: &Response) -> String {
    res.headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

fn set_cookies(res: &Response) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// `sid=<signed value>` from the response, ready for a Cookie header.
fn session_cookie(res: &Response) -> Option<String> {
    set_cookies(res)
        .into_iter()
        .find(|c| c.starts_with("sid="))
        .and_then(|c| c.split(';').next().map(str::to_string))
}

fn state_param(location: &str) -> String {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter")
}

async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_persists_state_before_redirecting() {
    let h = Harness::new(FakeProvider::default());

    let res = h.get("/auth/login?redirect=/projects/42", None).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    let location = location(&res);
    assert!(location.starts_with(AUTHORIZE_URL));

    let set_cookie = set_cookies(&res).join("\n");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));

    let cookie = session_cookie(&res).unwrap();
    let session = h.stored(&cookie).await.expect("session saved");
    assert_eq!(session.oauth_state, Some(state_param(&location)));
    assert_eq!(session.post_login_redirect.as_deref(), Some("/projects/42"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn login_ignores_external_redirect() {
    let h = Harness::new(FakeProvider::default());

    let (cookie, _) = h
        .start_login("/auth/login?redirect=https://evil.example.com/")
        .await;

    let session = h.stored(&cookie).await.unwrap();
    assert_eq!(session.post_login_redirect, None);
}

#[tokio::test]
async fn login_again_reuses_session_and_rotates_state() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, first_state) = h.start_login("/auth/login").await;

    let res = h.get("/auth/login", Some(&cookie)).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(session_cookie(&res), None);
    let second_state = state_param(&location(&res));
    assert_ne!(first_state, second_state);
    assert_eq!(
        h.stored(&cookie).await.unwrap().oauth_state,
        Some(second_state)
    );
}

#[tokio::test]
async fn callback_success_authenticates_and_redirects() {
    let h = Harness::new(FakeProvider::with_roles(&["editor"]));
    let (cookie, state) = h.start_login("/auth/login?redirect=/projects/42").await;

    let res = h
        .get(
            &format!("/auth/callback?code=abc&state={state}"),
            Some(&cookie),
        )
        .await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/projects/42");
    assert_eq!(h.provider.exchanged(), vec!["abc".to_string()]);

    let session = h.stored(&cookie).await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.oauth_state, None);
    assert_eq!(session.post_login_redirect, None);
    assert_eq!(session.access_token.as_deref(), Some("access-abc"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-abc"));
    let user = session.user.unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.roles, vec!["editor".to_string()]);
}

#[tokio::test]
async fn callback_without_stored_redirect_uses_default() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, state) = h.start_login("/auth/login").await;

    let res = h
        .get(
            &format!("/auth/callback?code=abc&state={state}"),
            Some(&cookie),
        )
        .await;

    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn callback_missing_parameters_is_400_and_leaves_session() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, state) = h.start_login("/auth/login").await;

    for uri in [
        format!("/auth/callback?state={state}"),
        format!("/auth/callback?code=&state={state}"),
        "/auth/callback?code=abc".to_string(),
    ] {
        let res = h.get(&uri, Some(&cookie)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    assert_eq!(h.stored(&cookie).await.unwrap().oauth_state, Some(state));
    assert!(h.provider.exchanged().is_empty());
}

#[tokio::test]
async fn callback_state_mismatch_is_403_without_exchange() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, _) = h.start_login("/auth/login").await;

    let res = h
        .get("/auth/callback?code=abc&state=forged", Some(&cookie))
        .await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(h.provider.exchanged().is_empty());
    assert!(!h.stored(&cookie).await.unwrap().is_authenticated());

    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn callback_without_session_is_403() {
    let h = Harness::new(FakeProvider::default());

    let res = h.get("/auth/callback?code=abc&state=whatever", None).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(h.provider.exchanged().is_empty());
}

#[tokio::test]
async fn state_is_single_use() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, state) = h.start_login("/auth/login").await;
    let callback = format!("/auth/callback?code=abc&state={state}");

    assert_eq!(h.get(&callback, Some(&cookie)).await.status(), StatusCode::FOUND);

    let replay = h.get(&callback, Some(&cookie)).await;
    assert_eq!(replay.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.provider.exchanged().len(), 1);
}

#[tokio::test]
async fn exchange_failure_is_500_and_consumes_state() {
    let h = Harness::new(FakeProvider {
        fail_exchange: true,
        ..FakeProvider::default()
    });
    let (cookie, state) = h.start_login("/auth/login").await;
    let callback = format!("/auth/callback?code=abc&state={state}");

    let res = h.get(&callback, Some(&cookie)).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let session = h.stored(&cookie).await.unwrap();
    assert_eq!(session.oauth_state, None);
    assert!(!session.is_authenticated());

    let replay = h.get(&callback, Some(&cookie)).await;
    assert_eq!(replay.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.provider.exchanged().len(), 1);
}

#[tokio::test]
async fn user_info_failure_is_500_and_stores_no_tokens() {
    let h = Harness::new(FakeProvider {
        fail_user_info: true,
        ..FakeProvider::default()
    });
    let (cookie, state) = h.start_login("/auth/login").await;

    let res = h
        .get(
            &format!("/auth/callback?code=abc&state={state}"),
            Some(&cookie),
        )
        .await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let session = h.stored(&cookie).await.unwrap();
    assert_eq!(session.access_token, None);
    assert_eq!(session.user, None);
}

#[tokio::test]
async fn denied_authorization_is_400_after_consuming_state() {
    let h = Harness::new(FakeProvider::default());
    let (cookie, state) = h.start_login("/auth/login").await;

    let res = h
        .get(
            &format!("/auth/callback?error=access_denied&state={state}"),
            Some(&cookie),
        )
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.stored(&cookie).await.unwrap().oauth_state, None);
    assert!(h.provider.exchanged().is_empty());
}

#[tokio::test]
async fn status_reports_anonymous_and_authenticated() {
    let h = Harness::new(FakeProvider::with_roles(&["admin"]));

    let anonymous = json_body(h.get("/auth/status", None).await).await;
    assert_eq!(anonymous, json!({ "authenticated": false }));

    let cookie = h.sign_in().await;
    let signed_in = json_body(h.get("/auth/status", Some(&cookie)).await).await;
    assert_eq!(signed_in["authenticated"], true);
    assert_eq!(signed_in["user"]["id"], "user-1");
    assert_eq!(signed_in["user"]["email"], "user@example.com");
    assert_eq!(signed_in["user"]["roles"], json!(["admin"]));
}

#[tokio::test]
async fn forged_cookie_is_anonymous() {
    let h = Harness::new(FakeProvider::default());
    h.sign_in().await;

    let res = h.get("/auth/status", Some("sid=not-a-signed-value")).await;

    assert_eq!(json_body(res).await["authenticated"], false);
}

#[tokio::test]
async fn logout_revokes_tokens_and_destroys_session() {
    let h = Harness::new(FakeProvider::default());
    let cookie = h.sign_in().await;
    let id = h.session_id(&cookie);

    let res = h.get("/auth/logout", Some(&cookie)).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
    assert_eq!(
        h.provider.revoked(),
        vec!["access-abc".to_string(), "refresh-abc".to_string()]
    );
    assert!(h.store.load(&id).await.unwrap().is_none());
    assert!(
        set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("sid=") && c.contains("Max-Age=0"))
    );

    let status = json_body(h.get("/auth/status", Some(&cookie)).await).await;
    assert_eq!(status["authenticated"], false);
}

#[tokio::test]
async fn logout_honours_only_safe_redirects() {
    let h = Harness::new(FakeProvider::default());

    let res = h.get("/auth/logout?redirect=/goodbye", None).await;
    assert_eq!(location(&res), "/goodbye");

    let res = h
        .get("/auth/logout?redirect=//evil.example.com", None)
        .await;
    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn logout_without_session_still_redirects() {
    let h = Harness::new(FakeProvider::default());

    let res = h.get("/auth/logout", None).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(h.provider.revoked().is_empty());
}

#[tokio::test]
async fn guarded_pages_follow_session_state() {
    let h = Harness::new(FakeProvider::with_roles(&["editor"]));

    let res = h.get("/secure", None).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth/login?redirect=%2Fsecure");

    let cookie = h.sign_in().await;
    assert_eq!(h.get("/secure", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(
        h.get("/admin", Some(&cookie)).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn admin_page_admits_admins() {
    let h = Harness::new(FakeProvider::with_roles(&["admin"]));
    let cookie = h.sign_in().await;

    let res = h.get("/admin", Some(&cookie)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn login_fails_without_redirect_when_store_is_unavailable() {
    let h = Harness::new(FakeProvider::default());
    let cookie = h.sign_in().await;
    let app = unavailable_app(h.key.clone());

    for cookie in [None, Some(cookie.as_str())] {
        let res = send(&app, "/auth/login?redirect=/projects/42", cookie).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().get(header::LOCATION).is_none());
        assert!(set_cookies(&res).is_empty());
    }
}

#[tokio::test]
async fn logout_still_redirects_when_store_is_unavailable() {
    let h = Harness::new(FakeProvider::default());
    let cookie = h.sign_in().await;
    let app = unavailable_app(h.key.clone());

    let res = send(&app, "/auth/logout?redirect=/goodbye", Some(&cookie)).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/goodbye");
    assert!(
        set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("sid=") && c.contains("Max-Age=0"))
    );
}

#[tokio::test]
async fn unreadable_session_is_treated_as_signed_out() {
    let h = Harness::new(FakeProvider::with_roles(&["admin"]));
    let cookie = h.sign_in().await;
    let app = unavailable_app(h.key.clone());

    let res = send(&app, "/secure", Some(&cookie)).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth/login?redirect=%2Fsecure");

    let status = json_body(send(&app, "/auth/status", Some(&cookie)).await).await;
    assert_eq!(status, json!({ "authenticated": false }));
}
