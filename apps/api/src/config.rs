//! API server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use pharmatrade_db::DbConfig;

/// Signing secret used when `JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "pharmatrade-dev-secret-change-in-production";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind
    pub http_host: String,

    /// HTTP port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Bound on waiting for another transaction's write lock
    pub db_lock_timeout: Duration,

    /// Deadline for one order placement
    pub order_timeout: Duration,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// True when `jwt_secret` came from the built-in default
    pub jwt_secret_is_default: bool,

    /// Session token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Where license documents are written
    pub upload_dir: PathBuf,

    /// Maximum accepted signup body size in bytes (default: 10MB)
    pub max_upload_bytes: usize,

    /// Prefix for license links shown to administrators
    pub public_base_url: String,

    /// Whether anyone may sign up as ADMIN
    pub allow_admin_signup: bool,

    /// Pretty or JSON log lines
    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.trim().is_empty());
        let jwt_secret_is_default = jwt_secret.is_none();

        let config = ApiConfig {
            http_host: lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,

            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| "./data/pharmatrade.db".to_string())
                .into(),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,

            db_lock_timeout: Duration::from_secs(parse_or(&lookup, "DB_LOCK_TIMEOUT_SECS", 5)?),

            order_timeout: Duration::from_secs(parse_or(&lookup, "ORDER_TIMEOUT_SECS", 15)?),

            jwt_secret: jwt_secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),

            jwt_secret_is_default,

            jwt_lifetime_secs: parse_or(&lookup, "JWT_LIFETIME_SECS", 86_400)?, // 24 hours

            upload_dir: lookup("UPLOAD_DIR")
                .unwrap_or_else(|| "./uploads".to_string())
                .into(),

            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),

            allow_admin_signup: parse_bool_or(&lookup, "ALLOW_ADMIN_SIGNUP", true)?,

            log_format: match lookup("LOG_FORMAT")
                .unwrap_or_else(|| "pretty".to_string())
                .to_ascii_lowercase()
                .as_str()
            {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidValue("LOG_FORMAT".to_string())),
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }

        Ok(config)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.http_host, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HTTP_HOST".to_string()))
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .lock_timeout(self.db_lock_timeout)
            .transaction_timeout(self.order_timeout)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        },
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./data/pharmatrade.db"));
        assert_eq!(config.db_lock_timeout, Duration::from_secs(5));
        assert_eq!(config.order_timeout, Duration::from_secs(15));
        assert_eq!(config.jwt_lifetime_secs, 86_400);
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert!(config.allow_admin_signup);
        assert!(config.jwt_secret_is_default);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("ALLOW_ADMIN_SIGNUP", "false"),
            ("LOG_FORMAT", "JSON"),
            ("PUBLIC_BASE_URL", "https://pharma.example/"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(!config.jwt_secret_is_default);
        assert!(!config.allow_admin_signup);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.public_base_url, "https://pharma.example");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(k)) if k == "HTTP_PORT"
        ));
        assert!(load(&[("ALLOW_ADMIN_SIGNUP", "maybe")]).is_err());
        assert!(load(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_db_config_carries_timeouts() {
        let config = load(&[("DB_LOCK_TIMEOUT_SECS", "2"), ("ORDER_TIMEOUT_SECS", "7")]).unwrap();
        let db = config.db_config();

        assert_eq!(db.lock_timeout, Duration::from_secs(2));
        assert_eq!(db.transaction_timeout, Duration::from_secs(7));
    }
}
