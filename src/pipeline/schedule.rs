//! Cron triggering of the pipelines.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;
use crate::pipeline::{Context, PipelineKind, run};

/// Pair every requested pipeline with its cron expression.
///
/// Fails if any of them has none configured.
pub fn plan(schedule: &ScheduleConfig, kinds: &[PipelineKind]) -> Result<Vec<(PipelineKind, String)>> {
    kinds
        .iter()
        .map(|&kind| {
            kind.cron(schedule)
                .map(|cron| (kind, cron.to_string()))
                .ok_or_else(|| AppError::config(format!("schedule.{kind} is not set")))
        })
        .collect()
}

/// Schedule the requested pipelines and run until Ctrl-C.
///
/// The plan is checked before the scheduler starts, so a missing
/// expression aborts without any network activity.
pub async fn serve(ctx: Arc<Context>, kinds: &[PipelineKind]) -> Result<()> {
    let jobs = plan(&ctx.config.schedule, kinds)?;

    let mut scheduler = JobScheduler::new().await.map_err(AppError::schedule)?;
    for (kind, cron) in jobs {
        let ctx = Arc::clone(&ctx);
        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                run(kind, &ctx).await;
            })
        })
        .map_err(|e| AppError::schedule(format!("{kind} ({cron}): {e}")))?;
        scheduler.add(job).await.map_err(AppError::schedule)?;
        log::info!("Scheduled {} at '{}'", kind, cron);
    }

    scheduler.start().await.map_err(AppError::schedule)?;
    tokio::signal::ctrl_c().await?;

    log::info!("Shutting down scheduler");
    scheduler.shutdown().await.map_err(AppError::schedule)?;
    Ok(())
}
