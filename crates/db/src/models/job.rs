//! Job entity model and DTOs.

use nvoi_core::jobs::{JobStatus, JobType};
use nvoi_core::status::UnknownVariant;
use nvoi_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `jobs` table.
///
/// Serialized in camelCase: this is the `data` field of every job update
/// pushed over the dashboard WebSocket and the shape of `initialJobs`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub job_type: String,
    pub key: String,
    pub status: String,
    pub payload: Option<serde_json::Value>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    pub fn status(&self) -> Result<JobStatus, UnknownVariant> {
        self.status.parse()
    }

    pub fn job_type(&self) -> Result<JobType, UnknownVariant> {
        self.job_type.parse()
    }
}

/// DTO for inserting a new queued job.
#[derive(Debug)]
pub struct CreateJob {
    pub user_id: DbId,
    pub job_type: JobType,
    /// Fully composed `"<userId>:<clientKey>"` key.
    pub key: String,
    pub payload: serde_json::Value,
}
