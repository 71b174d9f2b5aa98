use serde::Deserialize;

/// `?redirect=` on `/auth/login` and `/auth/logout`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

/// Query string the authorization server sends back to `/auth/callback`.
///
/// Everything is optional so that missing parameters become a 400 from the handler rather
/// than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackQuery {
    /// Empty strings count as missing.
    pub fn param(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.is_empty())
    }
}
