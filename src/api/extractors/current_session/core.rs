use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::CurrentSession;

/// Handler で CurrentSession を受け取るための extractor
/// middleware::session が request.extensions() に insert 済みである前提
/// 見つからない場合は anonymous として扱う（loader 未設定 = 誰もログインしていない）
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .unwrap_or_default())
    }
}
