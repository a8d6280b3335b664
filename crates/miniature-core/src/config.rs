//! Miniature Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Signing secret used when `SECRET_KEY` is not set. Refused in production.
pub const DEVELOPMENT_SECRET: &str = "development-secret-key-change-in-production";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Persistence backend and connection parameters
    pub database: DatabaseConfig,

    /// Token signing configuration
    pub auth: AuthConfig,

    /// Feed listing configuration
    pub feed: FeedConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then let the environment override it
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("PORT")? {
            self.server.port = port;
        }
        if let Ok(value) = std::env::var("ACCESS_LOG") {
            self.server.access_log = is_truthy(&value);
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(env) = std::env::var("APP_ENV") {
            self.server.environment = env;
        }

        // Persistence
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            self.database.backend = backend.parse()?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(host) = std::env::var("PG_HOST") {
            self.database.host = host;
        }
        if let Some(port) = parse_env("PG_PORT")? {
            self.database.port = port;
        }
        if let Ok(name) = std::env::var("PG_DATABASE") {
            self.database.name = name;
        }
        if let Ok(user) = std::env::var("PG_USER") {
            self.database.user = user;
        }
        if let Ok(password) = std::env::var("PG_PASSWORD") {
            self.database.password = password;
        }
        if let Some(size) = parse_env("PG_POOL_SIZE")? {
            self.database.pool_size = size;
        }

        // Auth
        if let Ok(secret) = std::env::var("SECRET_KEY") {
            self.auth.secret = secret;
        }
        if let Some(secs) = parse_env("TOKEN_LIFETIME_SECS")? {
            self.auth.token_lifetime_secs = secs;
        }

        // Feed
        if let Some(limit) = parse_env("FEED_LIMIT")? {
            self.feed.limit = limit;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }

    /// Reject configurations that must never reach production
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.is_empty() {
            return Err(ConfigError::MissingRequired("SECRET_KEY".to_string()));
        }
        if self.server.is_production() && self.auth.uses_development_secret() {
            return Err(ConfigError::InsecureSecret);
        }
        if self.feed.limit <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "FEED_LIMIT".to_string(),
                value: self.feed.limit.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Empty, `false` and `0` mean off; anything else means on. An unset variable
/// leaves the default untouched.
pub fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "" | "false" | "0")
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Log every request (method, path, status)
    pub access_log: bool,

    /// Allowed origins for CORS; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Deployment environment name (`development`, `production`, ...)
    pub environment: String,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            access_log: false,
            cors_origins: vec![],
            environment: "development".to_string(),
        }
    }
}

/// Which persistence collaborator backs the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Database connection configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,

    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,

    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,

    /// Maximum pooled connections
    pub pool_size: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "miniature".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            pool_size: 10,
        }
    }
}

/// Token signing configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret shared by every instance
    pub secret: String,

    /// Token lifetime in seconds
    pub token_lifetime_secs: u64,
}

impl AuthConfig {
    pub fn uses_development_secret(&self) -> bool {
        self.secret == DEVELOPMENT_SECRET
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[REDACTED]")
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEVELOPMENT_SECRET.to_string(),
            token_lifetime_secs: 3600, // 1 hour
        }
    }
}

/// Feed listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum posts fetched for the newest and trending listings
    pub limit: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("SECRET_KEY must be set to a non-default value in production")]
    InsecureSecret,
}
