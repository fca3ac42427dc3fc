//! Publishing job rows to the event bus.

use nvoi_core::types::DbId;
use nvoi_db::repositories::JobRepo;
use nvoi_db::DbPool;
use nvoi_events::{EventBus, JobUpdate};

/// Re-read the complete job row and publish it to its owner.
///
/// A row that no longer exists is skipped silently. Returns whether an
/// update was published.
pub async fn notify_job_update(
    pool: &DbPool,
    bus: &EventBus,
    job_id: DbId,
) -> Result<bool, sqlx::Error> {
    let Some(job) = JobRepo::find_by_id(pool, job_id).await? else {
        tracing::debug!(%job_id, "Job vanished before notification, skipping");
        return Ok(false);
    };

    tracing::debug!(%job_id, user_id = %job.user_id, status = %job.status, "Publishing job update");
    bus.publish(JobUpdate::from_job(job));
    Ok(true)
}
