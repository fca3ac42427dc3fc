pub mod app;
pub mod auth;
pub mod health;
pub mod invite;
pub mod oauth;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree (everything except `/health`).
///
/// Route hierarchy:
///
/// ```text
/// /auth/providers                       configured login providers (GET)
/// /auth/register                        email sign-up form (POST)
/// /auth/login                           email login form (POST)
///
/// /oauth/logout                         destroy session (POST)
/// /oauth/{provider}                     start login redirect (GET)
/// /oauth/{provider}/callback            finish login (GET)
///
/// /app                                  dashboard loader (GET, requires user)
/// /app/api/jobs                         submit job (POST, requires auth)
/// /app/jobs/ws                          job updates WebSocket (requires auth)
/// /app/settings/anthropic               connect page, code form, disconnect
///                                       (GET, POST, DELETE)
/// /app/workspace/invites                list, create (GET, POST)
/// /app/workspace/invites/{id}           cancel (DELETE)
///
/// /invite/{token}                       view, accept/decline (GET, POST)
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/oauth", oauth::router())
        .nest("/app", app::router())
        .nest("/invite", invite::router())
}
