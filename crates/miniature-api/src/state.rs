//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::jwt::TokenService;
use miniature_core::config::{AppConfig, StoreBackend};
use miniature_core::password::PasswordConfig;
use miniature_core::{
    ContentStore, CredentialStore, MemoryStore, PgStore, PostRepository, UserRepository,
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    pub credentials: CredentialStore,
    pub content: ContentStore,
    pub tokens: TokenService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire the stores onto explicit persistence collaborators
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(users),
            content: ContentStore::new(posts, config.feed.limit),
            tokens: TokenService::new(&config.auth),
            config,
            start_time: Instant::now(),
        }
    }

    /// Open the configured backend. PostgreSQL schemas are migrated on startup.
    pub async fn connect(config: AppConfig) -> miniature_core::Result<Self> {
        match config.database.backend {
            StoreBackend::Postgres => {
                let store = Arc::new(PgStore::connect(&config.database).await?);
                store.migrate().await?;
                Ok(Self::new(config, store.clone(), store))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on shutdown");
                Ok(Self::in_memory(config))
            }
        }
    }

    /// State backed by a fresh [`MemoryStore`]
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// Use cheaper Argon2 parameters for new secrets
    pub fn with_password_config(mut self, password: PasswordConfig) -> Self {
        self.credentials = self.credentials.with_password_config(password);
        self
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
