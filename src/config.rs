//! Process settings read from the environment (and `.env`, loaded by the
//! binary through `dotenvy`).
//!
//! | variable                | default                    |
//! |-------------------------|----------------------------|
//! | `GTFS_FEED_URLS_PATH`   | built-in MTA endpoints     |
//! | `GTFS_FETCH_TIMEOUT_MS` | `10000`                    |
//! | `GTFS_MAX_FEED_BYTES`   | `16777216`                 |
//! | `GTFS_API_KEY`          | none                       |
//! | `GTFS_API_KEY_HEADER`   | `x-api-key`                |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::FetchLimits;
use crate::registry::{EndpointRegistry, RegistryError};

pub const FEED_URLS_PATH_VAR: &str = "GTFS_FEED_URLS_PATH";
pub const FETCH_TIMEOUT_MS_VAR: &str = "GTFS_FETCH_TIMEOUT_MS";
pub const MAX_FEED_BYTES_VAR: &str = "GTFS_MAX_FEED_BYTES";
pub const API_KEY_VAR: &str = "GTFS_API_KEY";
pub const API_KEY_HEADER_VAR: &str = "GTFS_API_KEY_HEADER";

const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Immutable process configuration.
#[derive(Clone)]
pub struct Settings {
    pub feed_urls_path: Option<PathBuf>,
    pub limits: FetchLimits,
    pub api_key: Option<String>,
    pub api_key_header: String,
}

// Keep the API key out of logs and debug output.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("feed_urls_path", &self.feed_urls_path)
            .field("limits", &self.limits)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_urls_path: None,
            limits: FetchLimits::default(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout = match get(FETCH_TIMEOUT_MS_VAR) {
            Some(raw) => Duration::from_millis(positive(FETCH_TIMEOUT_MS_VAR, &raw)?),
            None => defaults.limits.timeout,
        };
        let max_bytes = match get(MAX_FEED_BYTES_VAR) {
            Some(raw) => positive(MAX_FEED_BYTES_VAR, &raw)?
                .try_into()
                .unwrap_or(usize::MAX),
            None => defaults.limits.max_bytes,
        };

        Ok(Self {
            feed_urls_path: get(FEED_URLS_PATH_VAR).map(PathBuf::from),
            limits: FetchLimits { timeout, max_bytes },
            api_key: get(API_KEY_VAR),
            api_key_header: get(API_KEY_HEADER_VAR).unwrap_or(defaults.api_key_header),
        })
    }

    /// Builds the endpoint registry: the configured file if any, otherwise
    /// the built-in MTA endpoints.
    pub fn load_registry(&self) -> Result<EndpointRegistry, ConfigError> {
        match &self.feed_urls_path {
            Some(path) => Ok(EndpointRegistry::load(path)?),
            None => {
                tracing::info!("No {FEED_URLS_PATH_VAR} set, using built-in MTA endpoints");
                Ok(EndpointRegistry::mta_defaults())
            }
        }
    }
}

fn positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.limits.timeout, Duration::from_millis(10_000));
        assert_eq!(settings.limits.max_bytes, 16 * 1024 * 1024);
        assert!(settings.feed_urls_path.is_none());
        assert!(settings.api_key.is_none());
        assert_eq!(settings.api_key_header, "x-api-key");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (FETCH_TIMEOUT_MS_VAR, "2500"),
            (MAX_FEED_BYTES_VAR, "1024"),
            (FEED_URLS_PATH_VAR, "feeds.json"),
            (API_KEY_VAR, "secret"),
        ]))
        .unwrap();
        assert_eq!(settings.limits.timeout, Duration::from_millis(2500));
        assert_eq!(settings.limits.max_bytes, 1024);
        assert_eq!(settings.feed_urls_path, Some(PathBuf::from("feeds.json")));
        assert_eq!(settings.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_numbers() {
        for bad in ["0", "-5", "ten"] {
            let err = Settings::from_lookup(lookup(&[(FETCH_TIMEOUT_MS_VAR, bad)])).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidNumber { var: FETCH_TIMEOUT_MS_VAR, .. }
            ));
        }
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = Settings::from_lookup(lookup(&[(API_KEY_VAR, "secret")])).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_default_registry() {
        let registry = Settings::default().load_registry().unwrap();
        assert!(registry.resolve("ACE").is_ok());
    }
}
