/*
 * Responsibility
 * - Config読み込み → 依存生成 (session backend / token client / cookie key) → Router 組み立て
 * - Middleware の適用 (session / security headers / http)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::{self, http::HttpLimits};
use crate::services::{
    cache::{MemoryClient, ValkeyClient},
    oauth::{OAuthClientConfig, TokenClient},
    session::{CacheSessionStore, SessionStore},
};
use crate::state::{AppState, AuthSettings, cookie_key};

fn init_tracing() {
    // RUST_LOG=info,oauth_session_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: fail fast
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting in {:?} mode on {} (authorization server {})",
        config.app_env,
        config.addr,
        config.auth_server_url
    );

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let sessions = build_session_store(config).await?;

    let oauth = TokenClient::new(
        OAuthClientConfig::new(config.auth_server_url.clone(), &config.auth_redirect_uri)
            .with_timeout(config.auth_http_timeout)
            .with_decode_access_token(config.decode_access_token),
    )?;

    Ok(AppState::new(
        Arc::new(oauth),
        sessions,
        AuthSettings::from_config(config),
        cookie_key(config.session_secret.as_deref()),
    ))
}

async fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let ttl = config.session_ttl_seconds;

    match config.redis_url.as_deref() {
        Some(url) => {
            let cache = ValkeyClient::new(url).await?;
            tracing::info!("session store: valkey");
            Ok(Arc::new(CacheSessionStore::new(Arc::new(cache), ttl)))
        }
        None => {
            if config.app_env.is_production() {
                tracing::warn!("REDIS_URL not set; sessions are kept in process memory");
            }
            let cache = MemoryClient::new();
            // Detached: runs for the lifetime of the runtime
            cache.spawn_sweeper(config.session_sweep_interval);
            tracing::info!("session store: memory");
            Ok(Arc::new(CacheSessionStore::new(Arc::new(cache), ttl)))
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let router = api::pages::routes().nest(api::auth::AUTH_PREFIX, api::auth::routes());

    let router = middleware::session::apply(router, state.clone()).with_state(state);
    let router = middleware::security_headers::apply(router);
    middleware::http::apply(router, HttpLimits::default())
}
