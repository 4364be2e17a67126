//! echonova-api library: music streaming REST backend
//!
//! Accounts, song catalog, playlists, play history, and proxies to the
//! recommendation and facial emotion services.

use axum::http::{request::Parts, HeaderValue};
use axum::Router;
use echonova_common::config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

use services::{Mailer, MlClient, MlClientError};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<Config>,
    /// Recommendation and emotion service client
    pub ml: MlClient,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Result<Self, MlClientError> {
        let ml = MlClient::new(&config.ml)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            ml,
            mailer,
        })
    }
}

/// Hosts browser clients may call from: local development and the Android
/// emulator's alias for the host machine
const CORS_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "10.0.2.2"];

/// Whether `origin` is an http(s) origin on one of [`CORS_HOSTS`]
pub fn is_allowed_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let host = rest.split([':', '/']).next().unwrap_or_default();
    CORS_HOSTS.contains(&host)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _: &Parts| {
            origin.to_str().map(is_allowed_origin).unwrap_or(false)
        }))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build application router
///
/// Authentication is enforced per handler through the `AuthUser` and
/// `AdminUser` extractors.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::song_routes())
        .merge(api::playlist_routes())
        .merge(api::history_routes())
        .merge(api::user_routes())
        .merge(api::anonymous_routes())
        .merge(api::admin_routes())
        .merge(api::recommendation_routes())
        .merge(api::emotion_routes())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        assert!(is_allowed_origin("http://localhost:3000"));
        assert!(is_allowed_origin("https://127.0.0.1"));
        assert!(is_allowed_origin("http://10.0.2.2:8081"));
        assert!(!is_allowed_origin("http://localhost.evil.com"));
        assert!(!is_allowed_origin("https://example.com"));
        assert!(!is_allowed_origin("ftp://localhost"));
    }
}
