//! Background housekeeping.
//!
//! Sweeps idle chat sessions and prunes finished genome jobs. Returns the
//! running [`JobScheduler`], which must be kept alive for the lifetime of
//! the process.

use std::sync::Arc;

use chrono::Utc;
use genome_chat::ChatManager;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::jobs::JobStore;

const JOB_RETENTION_HOURS: i64 = 24;

/// Builds and starts the scheduler.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    chat: Arc<ChatManager>,
    jobs: Arc<JobStore>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_session_sweep(&scheduler, chat).await?;
    register_job_prune(&scheduler, jobs).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Every minute, at second 0.
async fn register_session_sweep(
    scheduler: &JobScheduler,
    chat: Arc<ChatManager>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let chat = Arc::clone(&chat);
        Box::pin(async move {
            let purged = chat.purge_expired().await;
            if purged > 0 {
                tracing::info!(purged, "scheduler: expired chat sessions removed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Hourly, on the hour.
async fn register_job_prune(
    scheduler: &JobScheduler,
    jobs: Arc<JobStore>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let jobs = Arc::clone(&jobs);
        Box::pin(async move {
            let cutoff = Utc::now() - chrono::Duration::hours(JOB_RETENTION_HOURS);
            let pruned = jobs.prune_finished(cutoff).await;
            tracing::info!(pruned, "scheduler: finished genome jobs pruned");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
