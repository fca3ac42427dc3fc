//! Job lifecycle driver.
//!
//! For each message: `started` + notify, run the work step, then either
//! `completed` with the result or `error` with the message, + notify. A
//! failed work step is a job outcome, not a delivery failure; only errors
//! writing the row itself bubble up to the queue for redelivery. The row
//! stays `started` across redeliveries and is marked `error` only when the
//! queue gives up on the message. Finished rows are never reopened.

use std::future::Future;
use std::sync::Arc;

use nvoi_core::jobs::JobType;
use nvoi_db::repositories::JobRepo;
use nvoi_db::DbPool;
use nvoi_events::EventBus;
use serde_json::json;

use crate::error::WorkerError;
use crate::notify::notify_job_update;
use crate::queue::{JobHandler, JobMessage};

// ---------------------------------------------------------------------------
// JobWork
// ---------------------------------------------------------------------------

/// The work step of a job: turn a message into a result document.
pub trait JobWork: Send + Sync + 'static {
    fn perform(
        &self,
        message: &JobMessage,
    ) -> impl Future<Output = Result<serde_json::Value, WorkerError>> + Send;
}

/// Stand-in work: sleeps for the job type's duration and returns a fixed
/// result shaped like the real output.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    /// Multiplier for [`JobType::simulated_duration`].
    pub delay_scale: f64,
}

impl SimulatedWork {
    pub fn new(delay_scale: f64) -> Self {
        Self { delay_scale }
    }

    /// Result document produced for a job type.
    pub fn result_for(job_type: JobType, payload: &serde_json::Value) -> serde_json::Value {
        match job_type {
            JobType::Export => json!({ "file": "export.csv", "rows": 1000 }),
            JobType::Email => json!({ "sent": true, "to": payload.get("to") }),
            JobType::Report => json!({ "report": "sales-report.pdf", "pages": 25 }),
        }
    }
}

impl JobWork for SimulatedWork {
    async fn perform(&self, message: &JobMessage) -> Result<serde_json::Value, WorkerError> {
        let delay = message.job_type.simulated_duration().mul_f64(self.delay_scale);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::result_for(message.job_type, &message.payload))
    }
}

// ---------------------------------------------------------------------------
// JobProcessor
// ---------------------------------------------------------------------------

/// Production [`JobHandler`]: persists each status change and publishes it.
pub struct JobProcessor<W = SimulatedWork> {
    pool: DbPool,
    bus: Arc<EventBus>,
    work: W,
}

impl<W: JobWork> JobProcessor<W> {
    pub fn new(pool: DbPool, bus: Arc<EventBus>, work: W) -> Self {
        Self { pool, bus, work }
    }

    /// Drive one job through its lifecycle.
    pub async fn process(&self, message: &JobMessage) -> Result<(), WorkerError> {
        let job_id = message.job_id;

        if !JobRepo::mark_started(&self.pool, job_id).await? {
            return match JobRepo::find_by_id(&self.pool, job_id).await? {
                Some(job) => {
                    tracing::info!(%job_id, status = %job.status, "Job already finished, skipping");
                    Ok(())
                }
                None => Err(WorkerError::JobNotFound(job_id)),
            };
        }
        notify_job_update(&self.pool, &self.bus, job_id).await?;
        tracing::info!(%job_id, job_type = %message.job_type, "Job started");

        let recorded = match self.work.perform(message).await {
            Ok(result) => {
                let recorded = JobRepo::complete(&self.pool, job_id, &result).await?;
                tracing::info!(%job_id, "Job completed");
                recorded
            }
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Job failed");
                JobRepo::fail(&self.pool, job_id, &e.to_string()).await?
            }
        };
        if !recorded {
            tracing::warn!(%job_id, "Job row finished or removed during work, outcome dropped");
            return Ok(());
        }

        // The outcome is committed; a redelivery would only rerun the work.
        if let Err(e) = notify_job_update(&self.pool, &self.bus, job_id).await {
            tracing::error!(%job_id, error = %e, "Could not publish job outcome");
        }
        Ok(())
    }
}

impl<W: JobWork> JobHandler for JobProcessor<W> {
    async fn handle(&self, message: &JobMessage) -> Result<(), WorkerError> {
        match self.process(message).await {
            // The row is gone (e.g. its user was deleted); nothing to retry.
            Err(WorkerError::JobNotFound(job_id)) => {
                tracing::warn!(%job_id, "Job row missing, acknowledging message");
                Ok(())
            }
            other => other,
        }
    }

    /// Record the last delivery error on the row so the client sees the job
    /// end instead of hanging in `started`.
    async fn abandon(&self, message: &JobMessage, error: &WorkerError) {
        let job_id = message.job_id;
        match JobRepo::fail(&self.pool, job_id, &error.to_string()).await {
            Ok(true) => {
                if let Err(e) = notify_job_update(&self.pool, &self.bus, job_id).await {
                    tracing::error!(%job_id, error = %e, "Could not publish abandoned job");
                }
            }
            Ok(false) => tracing::debug!(%job_id, "Abandoned job already finished"),
            Err(e) => {
                tracing::error!(%job_id, error = %e, "Could not record job failure");
            }
        }
    }
}
