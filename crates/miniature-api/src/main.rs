//! Miniature API Server
//!
//! Author: hephaex@gmail.com

use miniature_api::{create_router, state::AppState};
use miniature_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "miniature_api={level},miniature_core={level},audit=info,tower_http={level}",
            level = config.level
        ))
    });

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);

    if config.auth.uses_development_secret() {
        tracing::warn!("SECRET_KEY is not set; using the development secret");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::connect(config).await?);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Miniature API Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
