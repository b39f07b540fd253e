use std::{env, fmt::Display, str::FromStr};

use log::{info, LevelFilter};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid value for {key}: {message}")]
pub struct ConfigError {
    key: &'static str,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Scylla,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scylla" => Ok(StorageBackend::Scylla),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u32,
    pub storage: StorageBackend,
    pub workers: usize,
    pub log_level: LevelFilter,
    pub page: PageConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct PageConfig {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        PageConfig {
            default_size: 10,
            max_size: 100,
        }
    }
}

impl PageConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError {
                key: "MAX_PAGE_SIZE",
                message: "must be at least 1".into(),
            });
        }
        if self.default_size == 0 || self.default_size > self.max_size {
            return Err(ConfigError {
                key: "DEFAULT_PAGE_SIZE",
                message: format!("must be between 1 and {}", self.max_size),
            });
        }
        Ok(self)
    }
}

/// Reads `LOG_LEVEL` alone so the logger can be installed before the rest of the
/// configuration is loaded.
pub fn log_level() -> Result<LevelFilter, ConfigError> {
    try_load("LOG_LEVEL", "debug")
}

impl Config {
    /// Loads every setting. Install the logger first, or the default notices are lost.
    pub fn load() -> Result<Self, ConfigError> {
        let nodes: String = try_load("SCYLLA_NODES", "127.0.0.1:9042")?;
        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:8080")?,
            scylla_nodes: nodes
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect(),
            keyspace: try_load("SCYLLA_KEYSPACE", "twitter_clone")?,
            replication_factor: try_load("SCYLLA_REPLICATION", "1")?,
            storage: try_load("STORAGE", "scylla")?,
            workers: try_load("HTTP_WORKERS", &num_cpus::get().to_string())?,
            log_level: log_level()?,
            page: PageConfig {
                default_size: try_load("DEFAULT_PAGE_SIZE", "10")?,
                max_size: try_load("MAX_PAGE_SIZE", "100")?,
            }
            .validate()?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e: T::Err| ConfigError {
        key,
        message: e.to_string(),
    })
}
