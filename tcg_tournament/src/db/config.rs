//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,

    /// Per-query timeout in seconds
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Configuration for `database_url` with default pool settings
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            query_timeout_secs: 5,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Returns `None` when `DATABASE_URL` is not set. Pool settings are read
    /// by [`DatabaseConfig::with_pool_env`].
    pub fn from_env() -> Option<Self> {
        env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self::new(url).with_pool_env())
    }

    /// Override pool settings from the environment
    ///
    /// - `DB_MAX_CONNECTIONS` (default: 20)
    /// - `DB_MIN_CONNECTIONS` (default: 2)
    /// - `DB_CONNECTION_TIMEOUT` in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT` in seconds (default: 600)
    /// - `DB_MAX_LIFETIME` in seconds (default: 1800)
    /// - `DB_QUERY_TIMEOUT` in seconds (default: 5)
    ///
    /// Unparseable values keep the default and are logged.
    pub fn with_pool_env(mut self) -> Self {
        self.max_connections = env_or("DB_MAX_CONNECTIONS", self.max_connections);
        self.min_connections = env_or("DB_MIN_CONNECTIONS", self.min_connections);
        self.connection_timeout_secs = env_or("DB_CONNECTION_TIMEOUT", self.connection_timeout_secs);
        self.idle_timeout_secs = env_or("DB_IDLE_TIMEOUT", self.idle_timeout_secs);
        self.max_lifetime_secs = env_or("DB_MAX_LIFETIME", self.max_lifetime_secs);
        self.query_timeout_secs = env_or("DB_QUERY_TIMEOUT", self.query_timeout_secs);
        self
    }

    /// Check pool bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be positive".to_string());
        }
        if self.min_connections > self.max_connections {
            return Err("DB_MIN_CONNECTIONS cannot exceed DB_MAX_CONNECTIONS".to_string());
        }
        if self.query_timeout_secs == 0 {
            return Err("DB_QUERY_TIMEOUT must be positive".to_string());
        }
        Ok(())
    }
}

fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}
