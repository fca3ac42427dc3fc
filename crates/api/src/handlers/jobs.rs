//! Handler for job submission.

use axum::extract::State;
use axum::Json;
use nvoi_core::jobs::{job_key, parse_job_type, validate_client_key};
use nvoi_core::types::DbId;
use nvoi_db::models::job::CreateJob;
use nvoi_db::repositories::JobRepo;
use nvoi_events::JobUpdate;
use nvoi_worker::JobMessage;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /app/api/jobs`.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    /// Client-chosen key, unique per user by convention.
    pub key: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub success: bool,
    pub job_id: DbId,
}

/// POST /app/api/jobs
///
/// Insert a `queued` job row, push it to the user's sockets, then hand it
/// to the worker queue.
pub async fn create_job(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJobRequest>,
) -> AppResult<Json<CreateJobResponse>> {
    validate_client_key(&input.key)?;
    let job_type = parse_job_type(&input.job_type)?;

    let payload = match input.payload {
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    };
    let key = job_key(user.id, &input.key);

    let job = JobRepo::create(
        &state.pool,
        &CreateJob {
            user_id: user.id,
            job_type,
            key: key.clone(),
            payload: payload.clone(),
        },
    )
    .await?;
    let job_id = job.id;
    tracing::info!(%job_id, user_id = %user.id, job_type = %job_type, "Job queued");

    // Publish before enqueueing so `queued` always precedes `started`.
    state.event_bus.publish(JobUpdate::from_job(job));

    state.job_queue.send(JobMessage {
        job_type,
        job_id,
        key,
        payload,
    })?;

    Ok(Json(CreateJobResponse {
        success: true,
        job_id,
    }))
}
