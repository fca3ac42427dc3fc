//! Handlers for the authorization-code login redirects.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::auth::random_token;
use crate::auth::session::{session_cookie, SessionData, SessionUser};
use crate::error::AppResult;
use crate::middleware::auth::Session;
use crate::oauth::registry::ANTHROPIC;
use crate::oauth::{handle_oauth_callback, provider_for};
use crate::response::{redirect, redirect_with_cookie};
use crate::state::AppState;

/// Random bytes in the CSRF `state` parameter.
const STATE_BYTES: usize = 16;

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user denied access or the provider failed.
    pub error: Option<String>,
}

/// GET /oauth/{provider}
///
/// Remember a fresh `state` in the session and send the browser to the
/// provider. Anthropic is connected from the settings page instead.
pub async fn start(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Session(mut session): Session,
) -> AppResult<Response> {
    if provider_name == ANTHROPIC {
        return Ok(redirect("/app/settings/anthropic"));
    }

    let provider = match provider_for(&provider_name, &state.config.oauth) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(provider = %provider_name, error = %e, "OAuth login unavailable");
            return Ok(redirect("/?error=oauth_unavailable"));
        }
    };

    let oauth_state = random_token(STATE_BYTES);
    let redirect_uri = state.config.oauth.redirect_uri(provider.name());
    let url = match provider.authorization_url(&oauth_state, &redirect_uri) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(provider = %provider_name, error = %e, "Failed to build authorization URL");
            return Ok(redirect("/?error=oauth_unavailable"));
        }
    };

    session.oauth_state = Some(oauth_state);
    let cookie = session_cookie(&session, &state.config.session)?;
    Ok(redirect_with_cookie(&url, cookie))
}

/// GET /oauth/{provider}/callback
///
/// Check `state` against the session, finish the login and go to the
/// dashboard. Every failure lands on `/` with an `error` parameter.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Query(query): Query<CallbackQuery>,
    Session(session): Session,
) -> AppResult<Response> {
    let provider = match provider_for(&provider_name, &state.config.oauth) {
        Ok(provider) => provider,
        Err(_) => return Ok(redirect("/?error=oauth_unavailable")),
    };

    if let Some(error) = &query.error {
        tracing::warn!(provider = %provider_name, %error, "Provider returned an error");
        return Ok(redirect("/?error=oauth_failed"));
    }

    let state_matches = matches!(
        (&query.state, &session.oauth_state),
        (Some(got), Some(expected)) if got == expected
    );
    if !state_matches {
        tracing::warn!(provider = %provider_name, "OAuth state mismatch");
        return Ok(redirect("/?error=invalid_oauth_state"));
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok(redirect("/?error=oauth_failed"));
    };

    let redirect_uri = state.config.oauth.redirect_uri(provider.name());
    let user = match handle_oauth_callback(
        &state.pool,
        &state.http,
        provider.as_ref(),
        code,
        &redirect_uri,
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(provider = %provider_name, error = %e, "OAuth callback failed");
            return Ok(redirect("/?error=oauth_failed"));
        }
    };

    let session = SessionData::for_user(SessionUser::from(&user));
    let cookie = session_cookie(&session, &state.config.session)?;
    Ok(redirect_with_cookie("/app", cookie))
}
