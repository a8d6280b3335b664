//! Miniature API - REST server
//!
//! Provides HTTP endpoints for accounts, tokens, posts and feeds.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use miniature_core::config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the application router with CORS and optional access logging
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = routes::api_routes(state.clone())
        .layer(cors_layer(&state.config.server))
        .with_state(state.clone());

    if state.config.server.access_log {
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );
    }

    router
}

/// Permissive when no origins are configured, otherwise an allow-list
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router over a fresh in-memory store with cheap password hashing
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(test_state()))
}

/// State behind [`create_router_for_testing`], for tests that need the stores
#[cfg(feature = "test-utils")]
pub fn test_state() -> AppState {
    use miniature_core::config::AppConfig;
    use miniature_core::password::PasswordConfig;

    AppState::in_memory(AppConfig::default()).with_password_config(PasswordConfig::low_cost())
}
