//! Exchange server configuration

use shared::models::Currency;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where accounts, wallets and orders are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Whether the ledger is served in-process or by another exchange-server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    Local,
    Remote,
}

/// Exchange server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    pub storage: StorageBackend,
    /// PostgreSQL connection URL (required for the postgres backend)
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub ledger_mode: LedgerMode,
    /// Ledger server base URL (required for the remote ledger)
    pub ledger_url: Option<String>,
    pub ledger_timeout_secs: u64,
    /// Upper bound for any single storage call made by the settlement saga
    pub storage_timeout: Duration,
    /// Currency of the account every new wallet starts with
    pub base_currency: Currency,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        if !matches!(
            environment.as_str(),
            "development" | "staging" | "production"
        ) {
            return Err(invalid("ENVIRONMENT", environment, "expected development, staging or production"));
        }

        let storage = match var("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(invalid("STORAGE_BACKEND", other, "expected postgres or memory")),
        };
        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let ledger_mode = match var("LEDGER_MODE").as_deref() {
            None | Some("local") => LedgerMode::Local,
            Some("remote") => LedgerMode::Remote,
            Some(other) => return Err(invalid("LEDGER_MODE", other, "expected local or remote")),
        };
        let ledger_url = var("LEDGER_URL");
        if ledger_mode == LedgerMode::Remote && ledger_url.is_none() {
            return Err(ConfigError::Missing("LEDGER_URL"));
        }

        let base_currency = match var("BASE_CURRENCY") {
            Some(code) => Currency::new(&code).map_err(|e| invalid("BASE_CURRENCY", &code, e))?,
            None => Currency::default(),
        };

        let storage_timeout_ms: u64 = parse(&var, "STORAGE_TIMEOUT_MS", 5000)?;
        if storage_timeout_ms == 0 {
            return Err(invalid("STORAGE_TIMEOUT_MS", "0", "must be positive"));
        }

        Ok(Self {
            environment,
            http_port: parse(&var, "HTTP_PORT", 8080)?,
            storage,
            database_url,
            database_max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            ledger_mode,
            ledger_url,
            ledger_timeout_secs: parse(&var, "LEDGER_TIMEOUT_SECS", 10)?,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            base_currency,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR"),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    /// In-memory development setup
    fn default() -> Self {
        Self {
            environment: "development".into(),
            http_port: 8080,
            storage: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            ledger_mode: LedgerMode::Local,
            ledger_url: None,
            ledger_timeout_secs: 10,
            storage_timeout: Duration::from_millis(5000),
            base_currency: Currency::default(),
            log_level: "info".into(),
            log_dir: None,
            log_json: false,
        }
    }
}

fn invalid(key: &'static str, value: impl Into<String>, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.into(),
        reason: reason.to_string(),
    }
}

fn parse<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(key, raw.clone(), e)),
        None => Ok(default),
    }
}
