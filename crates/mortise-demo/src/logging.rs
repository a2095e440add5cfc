//! Logging setup for the demo runner
//!
//! Console output is always on; a daily rolling `mortise.log` file can be
//! added with `log.file = true`. `RUST_LOG` takes precedence over the
//! configured level.

use std::path::PathBuf;

use mortise_core::MortiseConfig;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const LOG_FILE_NAME: &str = "mortise.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub file_logging: bool,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_logging: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig {
    /// Read `log.level`, `log.file` and `log.dir`
    pub fn from_config(config: &MortiseConfig) -> Self {
        let defaults = Self::default();
        let level = config
            .config
            .get_string("log.level")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.level);
        let file_logging = config.config.get_bool("log.file").unwrap_or(false);
        let log_dir = config
            .config
            .get_string("log.dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        Self {
            level,
            file_logging,
            log_dir,
        }
    }
}

/// Keeps the file writer alive; drop flushes buffered output
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_filter(env_filter(config.level));
    layers.push(Box::new(console_layer));

    let mut file_guard = None;
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .with_filter(env_filter(config.level));
        layers.push(Box::new(file_layer));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    if config.file_logging {
        tracing::info!(log_dir = %config.log_dir.display(), "File logging initialized");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Config;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.file_logging);
    }

    #[test]
    fn test_logging_config_from_config() {
        let config = Config::builder()
            .set_override("log.level", "debug")
            .unwrap()
            .set_override("log.file", true)
            .unwrap()
            .set_override("log.dir", "/tmp/mortise-logs")
            .unwrap()
            .build()
            .unwrap();
        let config = LoggingConfig::from_config(&MortiseConfig::from_config(config));

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.file_logging);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/mortise-logs"));
    }

    #[test]
    fn test_logging_config_bad_level_falls_back() {
        let config = Config::builder()
            .set_override("log.level", "loud")
            .unwrap()
            .build()
            .unwrap();
        let config = LoggingConfig::from_config(&MortiseConfig::from_config(config));
        assert_eq!(config.level, Level::INFO);
    }
}
