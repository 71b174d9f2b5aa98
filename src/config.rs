/*
 * Responsibility
 * - 環境変数や設定の読み込み (AUTH_SERVER_URL, SESSION_SECRET, REDIS_URL など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Minimum length of `SESSION_SECRET` in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_server_url: Url,
    pub auth_redirect_uri: String,
    pub auth_http_timeout: Duration,
    pub decode_access_token: bool,

    // None in development means "generate an ephemeral key"
    pub session_secret: Option<String>,
    pub session_cookie_name: String,
    pub session_ttl_seconds: u64,
    pub session_sweep_interval: Duration,
    pub redis_url: Option<String>,

    pub login_redirect: String,
    pub logout_redirect: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the session secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("auth_server_url", &self.auth_server_url.as_str())
            .field("auth_redirect_uri", &self.auth_redirect_uri)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("redis", &self.redis_url.is_some())
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = non_empty("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let auth_server_url = non_empty("AUTH_SERVER_URL")
            .ok_or(ConfigError::Missing("AUTH_SERVER_URL"))?;
        let auth_server_url =
            Url::parse(auth_server_url.trim()).map_err(|_| ConfigError::Invalid("AUTH_SERVER_URL"))?;

        let auth_redirect_uri = non_empty("AUTH_REDIRECT_URI")
            .ok_or(ConfigError::Missing("AUTH_REDIRECT_URI"))?;
        Url::parse(&auth_redirect_uri).map_err(|_| ConfigError::Invalid("AUTH_REDIRECT_URI"))?;

        let auth_http_timeout = Duration::from_secs(
            non_empty("AUTH_HTTP_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        );

        let decode_access_token = match non_empty("AUTH_DECODE_ACCESS_TOKEN") {
            None => true,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_DECODE_ACCESS_TOKEN"))?,
        };

        let session_secret = non_empty("SESSION_SECRET");
        match &session_secret {
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => {
                return Err(ConfigError::Invalid("SESSION_SECRET"));
            }
            None if app_env.is_production() => {
                return Err(ConfigError::Missing("SESSION_SECRET"));
            }
            _ => {}
        }

        let session_cookie_name =
            non_empty("SESSION_COOKIE_NAME").unwrap_or_else(|| "sid".to_string());

        let session_ttl_seconds = non_empty("SESSION_TTL_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(86_400); // 24 hours

        let session_sweep_interval = Duration::from_secs(
            non_empty("SESSION_SWEEP_INTERVAL_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(900), // 15 min
        );

        let redis_url = non_empty("REDIS_URL");

        let login_redirect = non_empty("LOGIN_REDIRECT").unwrap_or_else(|| "/".to_string());
        let logout_redirect = non_empty("LOGOUT_REDIRECT").unwrap_or_else(|| "/".to_string());

        Ok(Self {
            addr,
            app_env,
            auth_server_url,
            auth_redirect_uri,
            auth_http_timeout,
            decode_access_token,
            session_secret,
            session_cookie_name,
            session_ttl_seconds,
            session_sweep_interval,
            redis_url,
            login_redirect,
            logout_redirect,
        })
    }

    /// Session cookies carry the `Secure` attribute only in production.
    pub fn secure_cookies(&self) -> bool {
        self.app_env.is_production()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
