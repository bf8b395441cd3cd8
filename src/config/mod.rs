//! Configuration loading for the Marketplace Accounts API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `MARKET_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Application configuration derived from `MARKET_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Bearer tokens accepted on the admin review surface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_tokens: Vec<String>,
    /// Base URL of the external identity provider's admin API. When unset,
    /// the service runs with the in-memory provider (local profile only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_base_url: Option<String>,
    /// Service-role key for the identity admin API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_service_key: Option<String>,
    /// Bounded timeout applied to every identity provider call.
    #[serde(default = "default_identity_timeout_ms")]
    pub identity_timeout_ms: u64,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Approval-cascade reconciliation sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReconcileConfig {
    /// Sweep interval in seconds. `0` disables the sweep.
    #[serde(default = "default_reconcile_tick_seconds")]
    pub tick_seconds: u64,
    /// Maximum approved applications examined per tick.
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: u64,
    /// Jitter factor applied to the tick interval to de-synchronize
    /// replicas (0.0 to 1.0).
    #[serde(default = "default_reconcile_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_reconcile_tick_seconds(),
            batch_size: default_reconcile_batch_size(),
            jitter_factor: default_reconcile_jitter_factor(),
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_seconds > 0 && self.tick_seconds < 10 {
            return Err(ConfigError::InvalidReconcileTick {
                value: self.tick_seconds,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidReconcileBatchSize);
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidReconcileJitter {
                value: self.jitter_factor,
            });
        }
        Ok(())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid identity base URL '{value}': {source}")]
    InvalidIdentityBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("identity base URL is set but MARKET_IDENTITY_SERVICE_KEY is missing")]
    MissingIdentityServiceKey,
    #[error("reconcile tick must be 0 (disabled) or at least 10 seconds, got {value}")]
    InvalidReconcileTick { value: u64 },
    #[error("reconcile batch size must be positive")]
    InvalidReconcileBatchSize,
    #[error("reconcile jitter factor must be between 0.0 and 1.0, got {value}")]
    InvalidReconcileJitter { value: f64 },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            admin_tokens: Vec::new(),
            identity_base_url: None,
            identity_service_key: None,
            identity_timeout_ms: default_identity_timeout_ms(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the configured bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr().map_err(|source| ConfigError::InvalidBindAddr {
            value: self.api_bind_addr.clone(),
            source,
        })?;

        if let Some(base) = &self.identity_base_url {
            Url::parse(base).map_err(|source| ConfigError::InvalidIdentityBaseUrl {
                value: base.clone(),
                source,
            })?;
            if self.identity_service_key.is_none() {
                return Err(ConfigError::MissingIdentityServiceKey);
            }
        }

        self.reconcile.validate()
    }

    /// Render the configuration as JSON with secrets redacted, for startup
    /// logging.
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.admin_tokens.is_empty() {
            config.admin_tokens = vec!["[REDACTED]".to_string()];
        }
        if config.identity_service_key.is_some() {
            config.identity_service_key = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }
}

/// Loads layered environment configuration.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration from layered env files and the process
    /// environment, which is overlaid last so it wins.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("MARKET_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Admin tokens: single token or comma-separated list.
        let admin_tokens = if let Some(tokens) = layered.remove("ADMIN_TOKENS") {
            tokens
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else if let Some(token) = layered.remove("ADMIN_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let identity_base_url = layered
            .remove("IDENTITY_BASE_URL")
            .filter(|v| !v.trim().is_empty());
        let identity_service_key = layered
            .remove("IDENTITY_SERVICE_KEY")
            .filter(|v| !v.trim().is_empty());
        let identity_timeout_ms = layered
            .remove("IDENTITY_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_identity_timeout_ms);

        let reconcile = ReconcileConfig {
            tick_seconds: layered
                .remove("RECONCILE_TICK_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reconcile_tick_seconds),
            batch_size: layered
                .remove("RECONCILE_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reconcile_batch_size),
            jitter_factor: layered
                .remove("RECONCILE_JITTER_FACTOR")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reconcile_jitter_factor),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            admin_tokens,
            identity_base_url,
            identity_service_key,
            identity_timeout_ms,
            reconcile,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("MARKET_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("MARKET_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_identity_timeout_ms() -> u64 {
    10_000
}

fn default_reconcile_tick_seconds() -> u64 {
    300
}

fn default_reconcile_batch_size() -> u64 {
    50
}

fn default_reconcile_jitter_factor() -> f64 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.profile, "local");
        assert_eq!(config.reconcile.tick_seconds, 300);
    }

    #[test]
    fn layered_files_are_merged_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "MARKET_API_BIND_ADDR=127.0.0.1:9000\nMARKET_LOG_LEVEL=debug\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(".env.local"),
            "MARKET_API_BIND_ADDR=127.0.0.1:9001\n",
        )
        .unwrap();

        let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap();

        assert_eq!(config.api_bind_addr, "127.0.0.1:9001");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn profile_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "MARKET_PROFILE=staging\nMARKET_DB_MAX_CONNECTIONS=5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(".env.staging"),
            "MARKET_DB_MAX_CONNECTIONS=20\n",
        )
        .unwrap();

        let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap();

        assert_eq!(config.profile, "staging");
        assert_eq!(config.db_max_connections, 20);
    }

    #[test]
    fn admin_tokens_accept_comma_separated_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "MARKET_ADMIN_TOKENS=alpha, beta ,,gamma\n",
        )
        .unwrap();

        let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap();

        assert_eq!(config.admin_tokens, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn identity_base_url_requires_service_key() {
        let config = AppConfig {
            identity_base_url: Some("https://identity.example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingIdentityServiceKey)
        ));
    }

    #[test]
    fn invalid_identity_base_url_is_rejected() {
        let config = AppConfig {
            identity_base_url: Some("not a url".to_string()),
            identity_service_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIdentityBaseUrl { .. })
        ));
    }

    #[test]
    fn reconcile_bounds_are_enforced() {
        let too_fast = ReconcileConfig {
            tick_seconds: 5,
            ..Default::default()
        };
        assert!(too_fast.validate().is_err());

        let disabled = ReconcileConfig {
            tick_seconds: 0,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());

        let bad_jitter = ReconcileConfig {
            jitter_factor: 1.5,
            ..Default::default()
        };
        assert!(bad_jitter.validate().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_startup_dump() {
        let config = AppConfig {
            admin_tokens: vec!["super-secret".to_string()],
            identity_base_url: Some("https://identity.example.com".to_string()),
            identity_service_key: Some("service-key".to_string()),
            ..Default::default()
        };

        let dump = config.redacted_json().unwrap();
        assert!(!dump.contains("super-secret"));
        assert!(!dump.contains("service-key"));
        assert!(dump.contains("[REDACTED]"));
        // Non-secret values stay visible.
        assert!(dump.contains("identity.example.com"));
    }
}
