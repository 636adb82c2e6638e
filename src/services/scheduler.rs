use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::cache::MemoryCache;
use crate::config::LifecycleConfig;
use crate::domain::ActorContext;
use crate::services::AccountService;

const CACHE_SWEEP_CRON: &str = "0 */5 * * * *";

/// Background maintenance: the retention purge and expiry of throttle entries.
pub struct Scheduler {
    accounts: Arc<dyn AccountService>,
    cache: MemoryCache,
    config: LifecycleConfig,
    inner: Mutex<Option<JobScheduler>>,
}

impl Scheduler {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        cache: MemoryCache,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            accounts,
            cache,
            config,
            inner: Mutex::new(None),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let sched = JobScheduler::new().await?;

        if self.config.purge_enabled {
            let accounts = Arc::clone(&self.accounts);
            let days = self.config.purge_retention_days;
            let purge_job = Job::new_async(self.config.purge_cron.as_str(), move |_uuid, _lock| {
                let accounts = Arc::clone(&accounts);
                Box::pin(async move {
                    run_purge(accounts.as_ref(), days).await;
                })
            })?;
            sched.add(purge_job).await?;
            info!(
                "Purge scheduled: {} (retention {} days)",
                self.config.purge_cron, days
            );
        } else {
            info!("Scheduled purge is disabled in config");
        }

        let cache = self.cache.clone();
        let sweep_job = Job::new_async(CACHE_SWEEP_CRON, move |_uuid, _lock| {
            let cache = cache.clone();
            Box::pin(async move {
                let removed = cache.cleanup_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Expired throttle entries dropped");
                }
            })
        })?;
        sched.add(sweep_job).await?;

        sched.start().await?;
        *self.inner.lock().await = Some(sched);
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        let Some(mut sched) = self.inner.lock().await.take() else {
            return;
        };
        if let Err(e) = sched.shutdown().await {
            error!("Failed to stop scheduler: {}", e);
        }
    }
}

/// One retention sweep. Failures are logged; the next run retries.
pub async fn run_purge(accounts: &dyn AccountService, days: u32) {
    let start = std::time::Instant::now();
    info!(
        event = "job_started",
        job_name = "purge_deleted_accounts",
        "Starting scheduled purge"
    );

    match accounts
        .purge_older_than(&ActorContext::system(), days)
        .await
    {
        Ok(count) => info!(
            event = "job_finished",
            job_name = "purge_deleted_accounts",
            purged = count,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled purge finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = "purge_deleted_accounts",
            error = %e,
            "Scheduled purge failed"
        ),
    }
}
