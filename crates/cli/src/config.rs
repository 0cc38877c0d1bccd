//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `DATABASE_URL` - `PostgreSQL` connection string for signed-in carts and the catalog
//! - `PARTCART_DATA_DIR` - Directory holding the anonymous cart (default: .partcart)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! Engine settings (`CART_SYNC_*`) are read by [`SyncConfig::from_lookup`].

use std::path::PathBuf;

use partcart_sync::{ConfigError, SyncConfig};
use secrecy::SecretString;

const DEFAULT_DATA_DIR: &str = ".partcart";

/// CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    /// Remote store connection string
    pub database_url: Option<SecretString>,
    /// Directory for the file-backed local store
    pub data_dir: PathBuf,
    /// Sentry DSN
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Engine configuration
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an engine variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL").map(SecretString::from),
            data_dir: non_empty("PARTCART_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            sentry_dsn: non_empty("SENTRY_DSN"),
            sentry_environment: non_empty("SENTRY_ENVIRONMENT"),
            sync: SyncConfig::from_lookup(&lookup)?,
        })
    }

    /// The database URL, required for signed-in carts and migrations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `DATABASE_URL` is not set.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}
