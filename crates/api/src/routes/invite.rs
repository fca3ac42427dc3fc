//! Route definitions for the public `/invite` landing page.

use axum::routing::get;
use axum::Router;

use crate::handlers::invites;
use crate::state::AppState;

/// Routes mounted at `/invite`.
///
/// ```text
/// GET  /{token}  -> view_invite
/// POST /{token}  -> respond_to_invite
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{token}",
        get(invites::view_invite).post(invites::respond_to_invite),
    )
}
