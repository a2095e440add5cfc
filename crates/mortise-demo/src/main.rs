//! Mortise demo runner
//!
//! Runs a batch of jobs that serialize access to one resource through a
//! fencing-token mutex, either against Redis or an in-process store.

mod job;
mod logging;
mod telemetry;

use std::sync::Arc;

use clap::Parser;
use mortise_core::config::{MUTEX_NAME_PROPERTY, REDIS_URL_PROPERTY};
use mortise_core::{MemoryTokenStore, MortiseConfig, MutexManager, RedisTokenStore, TokenStore};

use crate::job::{RESOURCE_WORK, run_jobs};
use crate::logging::{LoggingConfig, init_logging};
use crate::telemetry::{init_metrics, log_snapshot};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "mortise-demo", about = "Run sample jobs guarded by a fencing-token mutex")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short = 'c', long = "config", default_value = "conf/mortise.yml")]
    config: String,
    /// Lock domain name
    #[arg(short = 'n', long = "name")]
    name: Option<String>,
    /// Redis connection URL
    #[arg(long = "redis-url", env = "MORTISE_REDIS_URL")]
    redis_url: Option<String>,
    /// Number of jobs to run
    #[arg(short = 'j', long = "jobs", default_value_t = 100)]
    jobs: u32,
    /// Use the in-process store instead of Redis
    #[arg(long = "memory")]
    memory: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<MortiseConfig> {
    let mut builder = MortiseConfig::builder(Some(cli.config.as_str()));

    if let Some(name) = &cli.name {
        builder = builder.set_override(MUTEX_NAME_PROPERTY, name.as_str())?;
    }
    if let Some(url) = &cli.redis_url {
        builder = builder.set_override(REDIS_URL_PROPERTY, url.as_str())?;
    }

    Ok(MortiseConfig::from_config(builder.build()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _logging = init_logging(&LoggingConfig::from_config(&config))
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let metrics = init_metrics()?;

    let store: Arc<dyn TokenStore> = if cli.memory {
        tracing::info!("Using in-process token store");
        Arc::new(MemoryTokenStore::new())
    } else {
        let url = config.redis_url();
        tracing::info!(url = %url, "Using redis token store");
        Arc::new(RedisTokenStore::connect(&url).await?)
    };

    let mutex = MutexManager::from_config(&config, store);
    let resource_key = format!(
        "Sync:{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    tracing::info!(
        domain = %mutex.name(),
        resource_key = %resource_key,
        jobs = cli.jobs,
        "Starting jobs"
    );

    let report = run_jobs(
        &mutex,
        &resource_key,
        cli.jobs,
        config.lock_ttl(),
        RESOURCE_WORK,
    )
    .await;
    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "All jobs finished"
    );
    log_snapshot(&metrics);
    Ok(())
}
