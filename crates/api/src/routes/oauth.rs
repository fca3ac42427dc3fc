//! Route definitions for the `/oauth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, oauth};
use crate::state::AppState;

/// Routes mounted at `/oauth`.
///
/// ```text
/// POST /logout                -> logout (GET is 405)
/// GET  /{provider}            -> start
/// GET  /{provider}/callback   -> callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/{provider}", get(oauth::start))
        .route("/{provider}/callback", get(oauth::callback))
}
