use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineConfig;

/// Log filter used when `RUST_LOG` is unset. Covers the service and store
/// crate as well as the worker itself.
pub const DEFAULT_LOG_FILTER: &str = "folio_worker=debug,folio_db=info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Postgres pool size (default: `20`).
    pub db_max_connections: u32,
    pub engine: EngineConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default  |
    /// |--------------------------|----------|
    /// | `DATABASE_URL`           | required |
    /// | `DB_MAX_CONNECTIONS`     | `20`     |
    /// | `SWEEP_MAX_WORKERS`      | `8`      |
    /// | `SWEEP_MAX_ATTEMPTS`     | `3`      |
    /// | `SWEEP_DEFAULT_SHARDS`   | `8`      |
    /// | `SWEEP_CHANNEL_CAPACITY` | `1024`   |
    /// | `SWEEP_RETRY_BACKOFF_MS` | `100`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            max_workers: parse_or(&lookup, "SWEEP_MAX_WORKERS", "positive integer", defaults.max_workers)?,
            max_attempts: parse_or(&lookup, "SWEEP_MAX_ATTEMPTS", "positive integer", defaults.max_attempts)?,
            default_shard_count: parse_or(
                &lookup,
                "SWEEP_DEFAULT_SHARDS",
                "positive integer",
                defaults.default_shard_count,
            )?,
            shard_override: None,
            channel_capacity: parse_or(
                &lookup,
                "SWEEP_CHANNEL_CAPACITY",
                "positive integer",
                defaults.channel_capacity,
            )?,
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "SWEEP_RETRY_BACKOFF_MS",
                "integer",
                defaults.retry_backoff.as_millis() as u64,
            )?),
        };

        let db_max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", "positive integer", 20)?;

        for (name, value) in [
            ("DB_MAX_CONNECTIONS", db_max_connections as usize),
            ("SWEEP_MAX_WORKERS", engine.max_workers),
            ("SWEEP_DEFAULT_SHARDS", engine.default_shard_count),
            ("SWEEP_CHANNEL_CAPACITY", engine.channel_capacity),
            ("SWEEP_MAX_ATTEMPTS", engine.max_attempts as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    expected: "positive integer",
                    value: "0".into(),
                });
            }
        }

        Ok(Self {
            database_url,
            db_max_connections,
            engine,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
    }
}
