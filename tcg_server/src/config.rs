//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::collections::HashSet;
use std::net::SocketAddr;
use tcg_tournament::{EngineConfig, db::DatabaseConfig};

/// Default bind address when neither the CLI nor `SERVER_BIND` sets one
pub const DEFAULT_BIND: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 8080);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` runs on the in-memory repository
    pub database: Option<DatabaseConfig>,
    /// Tournament engine settings
    pub engine: EngineConfig,
    /// Users allowed to manage every tournament
    pub admin_user_ids: HashSet<i64>,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_optional("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let database = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig::new(url).with_pool_env());

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            channel_capacity: parse_env_or("TOURNAMENT_CHANNEL_CAPACITY", defaults.channel_capacity),
            overtime_check_interval_secs: parse_env_or(
                "OVERTIME_CHECK_SECS",
                defaults.overtime_check_interval_secs,
            ),
            default_match_time_limit_minutes: parse_env_or(
                "DEFAULT_MATCH_TIME_LIMIT_MINUTES",
                defaults.default_match_time_limit_minutes,
            ),
            ordering_seed: parse_optional("ORDERING_SEED")?,
        };

        let admin_user_ids = match std::env::var("ADMIN_USER_IDS") {
            Ok(raw) => parse_id_list(&raw).map_err(|reason| ConfigError::Invalid {
                var: "ADMIN_USER_IDS".to_string(),
                reason,
            })?,
            Err(_) => HashSet::new(),
        };

        Ok(ServerConfig {
            bind,
            database,
            engine,
            admin_user_ids,
            metrics_bind: parse_optional("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "engine".to_string(),
                reason,
            })?;

        if let Some(database) = &self.database {
            database.validate().map_err(|reason| ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason,
            })?;
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an optional variable; a present but malformed value is an error
fn parse_optional<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

/// Parse a comma-separated list of user IDs
fn parse_id_list(raw: &str) -> Result<HashSet<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| format!("'{s}' is not a user ID")))
        .collect()
}
