//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CART_SYNC_DEBOUNCE_MS` - Write-back quiet period for signed-in carts (default: 500)
//! - `CART_SYNC_ANONYMOUS_DEBOUNCE_MS` - Quiet period for anonymous carts (default: 500)
//! - `CART_LOCAL_STORAGE_KEY` - Key of the anonymous cart in local storage (default: cart)
//! - `CART_SYNC_REMOTE_WRITE` - Remote write strategy, `diff` or `replace` (default: diff)
//! - `CART_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL, 0 disables (default: 300)

use std::str::FromStr;
use std::time::Duration;

use partcart_core::Identity;
use thiserror::Error;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_LOCAL_STORAGE_KEY: &str = "cart";
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the reconciler persists an authenticated cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteWriteStrategy {
    /// Upsert new or changed rows and delete removed rows relative to the last
    /// persisted cart.
    #[default]
    Diff,
    /// Delete every row for the user, then upsert every line.
    Replace,
}

impl FromStr for RemoteWriteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diff" => Ok(Self::Diff),
            "replace" => Ok(Self::Replace),
            other => Err(format!("expected `diff` or `replace`, got `{other}`")),
        }
    }
}

/// Cart synchronization configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period before an authenticated cart is written back
    pub authenticated_debounce: Duration,
    /// Quiet period before an anonymous cart is written back
    pub anonymous_debounce: Duration,
    /// Local storage key holding the anonymous cart
    pub local_storage_key: String,
    /// Remote write strategy
    pub remote_write: RemoteWriteStrategy,
    /// TTL for cached catalog lookups (`None` disables caching)
    pub catalog_cache_ttl: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            authenticated_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            anonymous_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            local_storage_key: DEFAULT_LOCAL_STORAGE_KEY.to_string(),
            remote_write: RemoteWriteStrategy::default(),
            catalog_cache_ttl: Some(Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS)),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let authenticated_debounce = get_debounce(&lookup, "CART_SYNC_DEBOUNCE_MS")?;
        let anonymous_debounce = get_debounce(&lookup, "CART_SYNC_ANONYMOUS_DEBOUNCE_MS")?;

        let local_storage_key = lookup("CART_LOCAL_STORAGE_KEY")
            .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_KEY.to_string());
        if local_storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_LOCAL_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let remote_write = match lookup("CART_SYNC_REMOTE_WRITE") {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar("CART_SYNC_REMOTE_WRITE".to_string(), e))?,
            None => RemoteWriteStrategy::default(),
        };

        let ttl_secs = parse_u64(&lookup, "CART_CATALOG_CACHE_TTL_SECS")?
            .unwrap_or(DEFAULT_CATALOG_CACHE_TTL_SECS);
        let catalog_cache_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));

        Ok(Self {
            authenticated_debounce,
            anonymous_debounce,
            local_storage_key,
            remote_write,
            catalog_cache_ttl,
        })
    }

    /// Debounce window for carts scoped to `identity`.
    #[must_use]
    pub const fn debounce_for(&self, identity: &Identity) -> Duration {
        match identity {
            Identity::Anonymous => self.anonymous_debounce,
            Identity::Authenticated(_) => self.authenticated_debounce,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional unsigned integer variable.
fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

/// Parse a debounce window, which must be strictly positive.
fn get_debounce(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Duration, ConfigError> {
    let millis = parse_u64(lookup, key)?.unwrap_or(DEFAULT_DEBOUNCE_MS);
    if millis == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "debounce window must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.authenticated_debounce, Duration::from_millis(500));
        assert_eq!(config.anonymous_debounce, Duration::from_millis(500));
        assert_eq!(config.local_storage_key, "cart");
        assert_eq!(config.remote_write, RemoteWriteStrategy::Diff);
        assert_eq!(config.catalog_cache_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_overrides() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("CART_SYNC_DEBOUNCE_MS", "250"),
            ("CART_SYNC_ANONYMOUS_DEBOUNCE_MS", "1000"),
            ("CART_LOCAL_STORAGE_KEY", "garage-cart"),
            ("CART_SYNC_REMOTE_WRITE", "Replace"),
            ("CART_CATALOG_CACHE_TTL_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.authenticated_debounce, Duration::from_millis(250));
        assert_eq!(config.anonymous_debounce, Duration::from_millis(1000));
        assert_eq!(config.local_storage_key, "garage-cart");
        assert_eq!(config.remote_write, RemoteWriteStrategy::Replace);
        assert_eq!(config.catalog_cache_ttl, None);
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let result = SyncConfig::from_lookup(lookup_from(&[("CART_SYNC_DEBOUNCE_MS", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "CART_SYNC_DEBOUNCE_MS"));
    }

    #[test]
    fn test_non_numeric_debounce_rejected() {
        let result =
            SyncConfig::from_lookup(lookup_from(&[("CART_SYNC_ANONYMOUS_DEBOUNCE_MS", "fast")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_write_strategy_rejected() {
        let result = SyncConfig::from_lookup(lookup_from(&[("CART_SYNC_REMOTE_WRITE", "merge")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_storage_key_rejected() {
        let result = SyncConfig::from_lookup(lookup_from(&[("CART_LOCAL_STORAGE_KEY", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debounce_for_identity() {
        let config = SyncConfig {
            authenticated_debounce: Duration::from_millis(100),
            anonymous_debounce: Duration::from_millis(900),
            ..SyncConfig::default()
        };
        assert_eq!(
            config.debounce_for(&Identity::Anonymous),
            Duration::from_millis(900)
        );
        assert_eq!(
            config.debounce_for(&Identity::user("U1")),
            Duration::from_millis(100)
        );
    }
}
