//! Miniature Core - Domain models, stores, and shared types
//!
//! This crate defines the core abstractions used by the Miniature service:
//! - User and post models (immutable records plus drafts)
//! - Common error taxonomy
//! - Persistence collaborator traits with PostgreSQL and in-memory backends
//! - Credential and content stores
//! - Configuration management

pub mod config;
pub mod content;
pub mod credentials;
pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;
pub mod repository;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, FeedConfig, StoreBackend};
pub use content::{top_level_feed, ContentStore};
pub use credentials::CredentialStore;
pub use memory::MemoryStore;
pub use models::{Post, PostDraft, PostId, User, UserDraft, UserId, UserPublic};
pub use postgres::PgStore;
pub use repository::{ListScope, PostRepository, UserRepository};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error taxonomy shared by every store
#[derive(Error, Debug)]
pub enum MiniatureError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MiniatureError {
    /// Build a constraint violation from anything printable
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation(message.into())
    }

    /// Wrap a persistence-layer failure
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::UpstreamFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MiniatureError>;
