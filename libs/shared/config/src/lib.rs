use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://clinic.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Connection settings for the clinic database.
///
/// Passed explicitly into `shared_database::Database::connect`; nothing in the
/// workspace reads connection details from ambient state after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub operator_token: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using default");
                    defaults.url.clone()
                }),
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            acquire_timeout_secs: parse_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs),
        };

        let config = Self {
            database,
            operator_token: env::var("CONSOLE_OPERATOR_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CONSOLE_OPERATOR_TOKEN not set, using empty value");
                    String::new()
                }),
            bind_addr: env::var("CONSOLE_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - operator credential missing, every protected request will be rejected");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.operator_token.is_empty() && !self.database.url.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
