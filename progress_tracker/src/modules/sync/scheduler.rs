use crate::modules::students::StudentStore;
use crate::modules::sync::SyncService;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use progress_tracker_libs::codeforces::client::CodeforcesApi;
use progress_tracker_libs::mail::Mailer;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

// Process-scoped: the recurring pass is registered once and runs until exit.
static SCHEDULER: OnceCell<JobScheduler> = OnceCell::new();

/// Registers the recurring full-population sync pass.
///
/// Registration happens once per process; a later call is a logged no-op.
/// There is no stop surface; the job lives until the process exits.
pub async fn start<A, S, M>(
    service: Arc<SyncService<A, S, M>>,
    cron: &str,
    timezone: Tz,
) -> Result<()>
where
    A: CodeforcesApi + Send + Sync + 'static,
    S: StudentStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    if SCHEDULER.get().is_some() {
        tracing::warn!("scheduled sync is already registered, ignoring start");
        return Ok(());
    }

    let sched = JobScheduler::new()
        .await
        .context("failed to create the job scheduler")?;

    let job = Job::new_async_tz(cron, timezone, move |_uuid, _lock| {
        let service = Arc::clone(&service);
        Box::pin(async move {
            tracing::info!("starting scheduled sync pass");
            match service.run_pass().await {
                Ok(report) => tracing::info!(
                    "scheduled sync pass finished: {} synced, {} reminders sent, {} failed out of {}",
                    report.synced,
                    report.reminders_sent,
                    report.failures.len(),
                    report.total,
                ),
                Err(e) => tracing::error!("scheduled sync pass could not run: {}", e),
            }
        })
    })
    .with_context(|| format!("failed to create the sync job for schedule [{}]", cron))?;

    sched
        .add(job)
        .await
        .context("failed to register the sync job")?;
    sched
        .start()
        .await
        .context("failed to start the job scheduler")?;

    tracing::info!("daily sync registered with schedule [{}] in {}", cron, timezone);

    if SCHEDULER.set(sched).is_err() {
        tracing::warn!("scheduled sync was registered concurrently");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::sync::testing::{MemoryStore, RecordingMailer, ScriptedApi};

    #[tokio::test]
    async fn start_is_idempotent() {
        let service = Arc::new(SyncService::new(
            ScriptedApi::succeeding(),
            MemoryStore::default(),
            RecordingMailer::default(),
        ));

        start(Arc::clone(&service), "0 0 2 * * *", chrono_tz::UTC)
            .await
            .unwrap();
        // The second registration must be a no-op, not a second job.
        start(service, "0 0 2 * * *", chrono_tz::UTC).await.unwrap();
    }
}
