//! Environment-driven server configuration
//!
//! | Variable                     | Default          |
//! |------------------------------|------------------|
//! | `CRICKET_ADDR`               | `0.0.0.0:3030`   |
//! | `CRICKET_DATA_DIR`           | `data`           |
//! | `CRICKET_STORAGE`            | `file`           |
//! | `CRICKET_COMMIT_STRATEGY`    | `transactional`  |
//! | `CRICKET_BROADCAST_CAPACITY` | `1024`           |
//! | `CRICKET_PUBLISH_TIMEOUT_MS` | `250`            |
//! | `CRICKET_JWT_SECRET`         | unset (read-only)|

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::scoring::CommitStrategy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where matches and ball logs are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub commit_strategy: CommitStrategy,
    /// Per-channel buffer; slower viewers are told to re-fetch
    pub broadcast_capacity: usize,
    pub publish_timeout: Duration,
    /// Writes are refused when unset
    pub jwt_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            data_dir: PathBuf::from("data"),
            storage: StorageBackend::File,
            commit_strategy: CommitStrategy::Transactional,
            broadcast_capacity: 1024,
            publish_timeout: Duration::from_millis(250),
            jwt_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parsed(&lookup, "CRICKET_ADDR")? {
            config.addr = addr;
        }
        if let Some(dir) = lookup("CRICKET_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(storage) = parsed(&lookup, "CRICKET_STORAGE")? {
            config.storage = storage;
        }
        if let Some(strategy) = parsed(&lookup, "CRICKET_COMMIT_STRATEGY")? {
            config.commit_strategy = strategy;
        }
        if let Some(capacity) = parsed::<usize, _>(&lookup, "CRICKET_BROADCAST_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    var: "CRICKET_BROADCAST_CAPACITY",
                    value: capacity.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.broadcast_capacity = capacity;
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "CRICKET_PUBLISH_TIMEOUT_MS")? {
            config.publish_timeout = Duration::from_millis(ms);
        }
        config.jwt_secret = lookup("CRICKET_JWT_SECRET").filter(|s| !s.is_empty());

        Ok(config)
    }
}

fn parsed<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.addr.port(), 3030);
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.commit_strategy, CommitStrategy::Transactional);
        assert_eq!(config.broadcast_capacity, 1024);
        assert_eq!(config.publish_timeout, Duration::from_millis(250));
        assert!(config.jwt_secret.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("CRICKET_ADDR", "127.0.0.1:8080"),
            ("CRICKET_DATA_DIR", "/var/lib/cricket"),
            ("CRICKET_STORAGE", "memory"),
            ("CRICKET_COMMIT_STRATEGY", "best_effort"),
            ("CRICKET_PUBLISH_TIMEOUT_MS", "50"),
        ])
        .unwrap();

        assert_eq!(config.addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/cricket"));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.commit_strategy, CommitStrategy::BestEffort);
        assert_eq!(config.publish_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = from_pairs(&[("CRICKET_STORAGE", "s3")]).unwrap_err();
        assert!(err.to_string().contains("CRICKET_STORAGE"));

        assert!(from_pairs(&[("CRICKET_BROADCAST_CAPACITY", "0")]).is_err());
        assert!(from_pairs(&[("CRICKET_ADDR", "nowhere")]).is_err());
    }
}
