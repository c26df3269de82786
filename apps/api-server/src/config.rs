//! Centralized configuration for vault-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Token accepted by the demo `/data` route when `ACCESS_TOKEN` is unset.
pub const DEFAULT_ACCESS_TOKEN: &str = "giveaccess";

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.eq_ignore_ascii_case("sqlite") {
            Ok(Self::Sqlite)
        } else if s.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else {
            Err(ConfigError {
                field: "STORAGE_PROVIDER",
                message: format!("'{}' is not one of memory, sqlite", s),
            })
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else {
            Err(ConfigError {
                field: "LOG_FORMAT",
                message: format!("'{}' is not one of pretty, json", s),
            })
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: PathBuf,
    /// Log format
    pub log_format: LogFormat,
    /// Query-string token checked by the demo `/data` route
    pub access_token: String,
    /// Insert sample records into an empty store at startup
    pub seed_demo: bool,
}

fn is_truthy(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Port
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("'{}' is not a valid port", raw),
            })?,
            None => 8080,
        };

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Storage provider
        let storage_provider = StorageProvider::parse(
            &lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()),
        )?;

        // DB path (for sqlite)
        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/vault.db"));

        // Log format
        let log_format =
            LogFormat::parse(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()))?;

        // Demo access token
        let access_token =
            lookup("ACCESS_TOKEN").unwrap_or_else(|| DEFAULT_ACCESS_TOKEN.to_string());
        if access_token.trim().is_empty() {
            return Err(ConfigError {
                field: "ACCESS_TOKEN",
                message: "must not be empty".into(),
            });
        }

        let seed_demo = lookup("SEED_DEMO").is_some_and(|s| is_truthy(&s));

        Ok(Self {
            port,
            cors_allow_origin,
            storage_provider,
            db_path,
            log_format,
            access_token,
            seed_demo,
        })
    }

    /// Log warnings about configuration that is fine for demos only.
    pub fn warn_if_insecure(&self) {
        if self.access_token == DEFAULT_ACCESS_TOKEN {
            tracing::warn!(
                "ACCESS_TOKEN not set: /data accepts the well-known demo token. \
                 Set ACCESS_TOKEN to change it."
            );
        }
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!("STORAGE_PROVIDER=memory: records are lost on restart.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn storage_provider_parsing() {
        assert_eq!(StorageProvider::parse("memory").unwrap(), StorageProvider::Memory);
        assert_eq!(StorageProvider::parse("sqlite").unwrap(), StorageProvider::Sqlite);
        assert_eq!(StorageProvider::parse("SQLITE").unwrap(), StorageProvider::Sqlite);
        assert!(StorageProvider::parse("anything").is_err());
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::parse("anything").is_err());
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.storage_provider, StorageProvider::Sqlite);
        assert_eq!(cfg.db_path, PathBuf::from("./data/vault.db"));
        assert_eq!(cfg.access_token, DEFAULT_ACCESS_TOKEN);
        assert!(!cfg.seed_demo);
    }

    #[test]
    fn invalid_values_fail_fast() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.field, "PORT");

        let err = load(&[("ACCESS_TOKEN", "  ")]).unwrap_err();
        assert_eq!(err.field, "ACCESS_TOKEN");

        let err = load(&[("STORAGE_PROVIDER", "sqllite")]).unwrap_err();
        assert_eq!(err.field, "STORAGE_PROVIDER");

        let err = load(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert_eq!(err.field, "LOG_FORMAT");
    }

    #[test]
    fn explicit_values_are_used() {
        let cfg = load(&[
            ("PORT", "3000"),
            ("STORAGE_PROVIDER", "memory"),
            ("ACCESS_TOKEN", "s3cret"),
            ("SEED_DEMO", "yes"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.storage_provider, StorageProvider::Memory);
        assert_eq!(cfg.access_token, "s3cret");
        assert!(cfg.seed_demo);
    }
}
