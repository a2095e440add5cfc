//! Mutex manager configuration
//!
//! Values are read from a `config::Config` with the keys below; every key is
//! optional and falls back to a default. Environment variables override file
//! values as `MORTISE_<SECTION>__<KEY>`, e.g. `MORTISE_MUTEX__RETRIES=3`.
//!
//! | Key                    | Default                     |
//! |------------------------|-----------------------------|
//! | `redis.url`            | `redis://127.0.0.1:6379/0`  |
//! | `mutex.name`           | `mortise`                   |
//! | `mutex.retries`        | `0`                         |
//! | `mutex.retry_delay_ms` | `50`                        |
//! | `lock.ttl_ms`          | `300`                       |

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};

pub const REDIS_URL_PROPERTY: &str = "redis.url";
pub const MUTEX_NAME_PROPERTY: &str = "mutex.name";
pub const MUTEX_RETRIES_PROPERTY: &str = "mutex.retries";
pub const MUTEX_RETRY_DELAY_PROPERTY: &str = "mutex.retry_delay_ms";
pub const LOCK_TTL_PROPERTY: &str = "lock.ttl_ms";

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_MUTEX_NAME: &str = "mortise";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 50;
pub const DEFAULT_LOCK_TTL_MS: u64 = 300;

/// Bounded retry applied to `lock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Extra attempts after the first one (0 = no retry)
    pub retries: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Total number of attempts a `lock` call may make
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Configuration wrapper with typed accessors
#[derive(Clone, Debug, Default)]
pub struct MortiseConfig {
    pub config: Config,
}

impl MortiseConfig {
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Config builder reading `path` (any format the `config` crate
    /// understands, skipped when missing) with `MORTISE_`-prefixed
    /// environment overrides on top
    pub fn builder(path: Option<&str>) -> ConfigBuilder<DefaultState> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder.add_source(
            Environment::with_prefix("mortise")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = Self::builder(path).build()?;
        Ok(Self { config })
    }

    pub fn redis_url(&self) -> String {
        self.config
            .get_string(REDIS_URL_PROPERTY)
            .unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string())
    }

    /// Lock domain name; should be unique per independent resource space
    pub fn mutex_name(&self) -> String {
        self.config
            .get_string(MUTEX_NAME_PROPERTY)
            .unwrap_or_else(|_| DEFAULT_MUTEX_NAME.to_string())
    }

    pub fn mutex_retries(&self) -> u32 {
        self.config
            .get_int(MUTEX_RETRIES_PROPERTY)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    pub fn mutex_retry_delay(&self) -> Duration {
        let millis = self
            .config
            .get_int(MUTEX_RETRY_DELAY_PROPERTY)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);
        Duration::from_millis(millis)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.mutex_retries(), self.mutex_retry_delay())
    }

    pub fn lock_ttl(&self) -> Duration {
        let millis = self
            .config
            .get_int(LOCK_TTL_PROPERTY)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_LOCK_TTL_MS);
        Duration::from_millis(millis)
    }
}
