//! Sample job guarding a shared resource
//!
//! Each job takes the lock, re-checks its token right before the simulated
//! resource operation, then releases the lock.

use std::time::Duration;

use mortise_core::{FencingToken, MutexManager, Result};

/// Duration of the simulated resource operation
pub const RESOURCE_WORK: Duration = Duration::from_millis(100);

/// Touch the resource only if `token` is still the recorded holder
pub async fn access_resource(
    mutex: &MutexManager,
    resource_key: &str,
    token: FencingToken,
    work: Duration,
) -> Result<()> {
    mutex.check_current_fencing_token(resource_key, token).await?;
    tokio::time::sleep(work).await;
    Ok(())
}

/// Lock, access, unlock; returns the token the job ran under
pub async fn job(
    mutex: &MutexManager,
    resource_key: &str,
    ttl: Duration,
    work: Duration,
) -> Result<FencingToken> {
    let token = mutex.lock(resource_key, ttl).await?;
    tracing::debug!(resource_key, token, "Job acquired lock");

    let accessed = access_resource(mutex, resource_key, token, work).await;
    // Release even when access was refused; a stale token just reports why.
    let released = mutex.unlock(resource_key, token).await;
    accessed?;
    released?;
    Ok(token)
}

/// Outcome counts of a batch of jobs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub succeeded: u32,
    pub failed: u32,
}

/// Run `jobs` jobs one after another against the same resource
pub async fn run_jobs(
    mutex: &MutexManager,
    resource_key: &str,
    jobs: u32,
    ttl: Duration,
    work: Duration,
) -> JobReport {
    let mut report = JobReport::default();
    for i in 0..jobs {
        match job(mutex, resource_key, ttl, work).await {
            Ok(token) => {
                report.succeeded += 1;
                tracing::info!(job = i, token, "Job finished");
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(job = i, kind = %err.kind(), error = %err, "Job failed");
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mortise_core::{ErrorKind, MemoryTokenStore};

    use super::*;

    fn memory_mutex() -> MutexManager {
        MutexManager::new("SyncJob", Arc::new(MemoryTokenStore::new()))
    }

    #[tokio::test]
    async fn test_jobs_run_sequentially() {
        let mutex = memory_mutex();
        let report = run_jobs(
            &mutex,
            "Sync:1",
            5,
            Duration::from_millis(300),
            Duration::from_millis(5),
        )
        .await;
        assert_eq!(
            report,
            JobReport {
                succeeded: 5,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_access_refused_after_lock_expires() {
        let mutex = memory_mutex();

        // Work outlives the lock; another holder takes over meanwhile.
        let token = mutex
            .lock("Sync:3", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = mutex
            .lock("Sync:3", Duration::from_millis(300))
            .await
            .unwrap();

        let err = access_resource(&mutex, "Sync:3", token, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutdatedToken);
        assert_eq!(err.current_token(), Some(newer));
    }

    #[tokio::test]
    async fn test_job_reports_contention() {
        let mutex = memory_mutex();
        mutex
            .lock("Sync:4", Duration::from_secs(5))
            .await
            .unwrap();

        let err = job(
            &mutex,
            "Sync:4",
            Duration::from_millis(300),
            Duration::ZERO,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MutexOccupied);
    }
}
