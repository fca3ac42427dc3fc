//! Route definitions for the logged-in `/app` area.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{anthropic, dashboard, invites, jobs};
use crate::relay::jobs_ws_handler;
use crate::state::AppState;

/// Routes mounted at `/app`.
///
/// ```text
/// GET    /                            -> dashboard
/// POST   /api/jobs                    -> create_job
/// GET    /jobs/ws                     -> jobs_ws_handler
/// GET    /settings/anthropic          -> settings
/// POST   /settings/anthropic          -> connect
/// DELETE /settings/anthropic          -> disconnect
/// GET    /workspace/invites           -> list_invites
/// POST   /workspace/invites           -> create_invite
/// DELETE /workspace/invites/{id}      -> cancel_invite
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/api/jobs", post(jobs::create_job))
        .route("/jobs/ws", get(jobs_ws_handler))
        .route(
            "/settings/anthropic",
            get(anthropic::settings)
                .post(anthropic::connect)
                .delete(anthropic::disconnect),
        )
        .route(
            "/workspace/invites",
            get(invites::list_invites).post(invites::create_invite),
        )
        .route("/workspace/invites/{id}", delete(invites::cancel_invite))
}
