//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! monthly credit refill.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Midnight UTC on the first day of every month.
const MONTHLY_REFILL_CRON: &str = "0 0 0 1 * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_refill_job(&scheduler, pool).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Resets every limited-plan balance to its monthly allowance.
async fn register_refill_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(MONTHLY_REFILL_CRON, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting monthly credit refill");
            run_refill_job(&pool).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_refill_job(pool: &PgPool) {
    match skuopt_db::profiles::refill_monthly_credits(pool).await {
        Ok(refilled) => {
            tracing::info!(profiles = refilled, "scheduler: monthly credit refill complete");
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: monthly credit refill failed");
        }
    }
}
