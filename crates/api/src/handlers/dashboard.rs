//! Handler for the dashboard loader.

use axum::extract::State;
use axum::Json;
use nvoi_core::jobs::RECENT_JOBS_LIMIT;
use nvoi_db::models::job::Job;
use nvoi_db::repositories::JobRepo;
use serde::Serialize;

use crate::auth::session::SessionUser;
use crate::error::AppResult;
use crate::middleware::auth::RequireUser;
use crate::state::AppState;

/// Loader data for `/app`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: SessionUser,
    /// The user's most recent jobs, newest first.
    pub initial_jobs: Vec<Job>,
}

/// GET /app
///
/// The logged-in user and their recent jobs. Live updates then arrive over
/// `/app/jobs/ws`.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> AppResult<Json<DashboardResponse>> {
    let initial_jobs = JobRepo::list_recent_for_user(&state.pool, user.id, RECENT_JOBS_LIMIT).await?;
    Ok(Json(DashboardResponse { user, initial_jobs }))
}
