//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use tradelink_core::{
    DEFAULT_INVITE_TTL_DAYS, DEFAULT_INVOICE_DUE_DAYS, INVITE_MAX_TTL_DAYS, INVITE_MIN_TTL_DAYS,
};

/// Signing secret used when `JWT_SECRET` is unset. Never use it in production.
const DEV_JWT_SECRET: &str = "tradelink-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Days until an invoice falls due when the caller gives no date
    pub invoice_due_days: i64,

    /// Invite lifetime when the issuer gives none
    pub invite_default_ttl_days: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,

            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| "./data/tradelink.db".to_string()),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,

            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),

            jwt_access_lifetime_secs: parse_or(&lookup, "JWT_ACCESS_LIFETIME_SECS", 86_400)?, // 1 day

            invoice_due_days: parse_or(&lookup, "INVOICE_DUE_DAYS", DEFAULT_INVOICE_DUE_DAYS)?,

            invite_default_ttl_days: parse_or(
                &lookup,
                "INVITE_DEFAULT_TTL_DAYS",
                DEFAULT_INVITE_TTL_DAYS,
            )?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if config.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        if config.invoice_due_days < 0 {
            return Err(ConfigError::InvalidValue("INVOICE_DUE_DAYS".to_string()));
        }
        if !(INVITE_MIN_TTL_DAYS..=INVITE_MAX_TTL_DAYS).contains(&config.invite_default_ttl_days) {
            return Err(ConfigError::InvalidValue("INVITE_DEFAULT_TTL_DAYS".to_string()));
        }

        Ok(config)
    }

    /// True when tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./data/tradelink.db");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.jwt_access_lifetime_secs, 86_400);
        assert_eq!(config.invoice_due_days, 30);
        assert_eq!(config.invite_default_ttl_days, 7);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("INVITE_DEFAULT_TTL_DAYS", "14"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.invite_default_ttl_days, 14);
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(key)) if key == "HTTP_PORT"
        ));
        assert!(matches!(
            load(&[("INVITE_DEFAULT_TTL_DAYS", "31")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
