//! Handlers for connecting an Anthropic account (PKCE, manual code entry).
//!
//! The settings loader issues a fresh `state` and PKCE verifier on every
//! visit and keeps both in the session. The user opens the returned URL,
//! authorizes, and pastes the displayed `code#state` back into the form,
//! which is posted together with the `state` it was rendered with.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::{Duration, Utc};
use nvoi_db::models::user::AnthropicTokens;
use nvoi_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::random_token;
use crate::auth::session::{session_cookie, SessionData, SessionUser};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, RequireUser, Session};
use crate::oauth::anthropic;
use crate::response::{redirect, redirect_with_cookie};
use crate::state::AppState;

const SETTINGS_PATH: &str = "/app/settings/anthropic";

/// Random bytes in the CSRF `state` parameter.
const STATE_BYTES: usize = 16;

/// Outcome flags the settings page was redirected back with.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Loader data for the settings page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnthropicSettingsResponse {
    pub user: SessionUser,
    pub auth_url: String,
    /// Value the code form must post back as `state`.
    pub state: String,
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

/// Form body for `POST /app/settings/anthropic`.
#[derive(Debug, Deserialize)]
pub struct ConnectForm {
    /// Pasted `code#state`.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// GET /app/settings/anthropic
pub async fn settings(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<SettingsQuery>,
) -> AppResult<Response> {
    let Some(row) = UserRepo::find_by_id(&state.pool, user.id).await? else {
        return Ok(redirect("/"));
    };

    let oauth_state = random_token(STATE_BYTES);
    let request = anthropic::build_auth_url(&oauth_state)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let session = SessionData {
        user: Some(user.clone()),
        oauth_state: Some(oauth_state.clone()),
        oauth_verifier: Some(request.verifier),
    };
    let cookie = session_cookie(&session, &state.config.session)?;

    let body = AnthropicSettingsResponse {
        user,
        auth_url: request.url,
        state: oauth_state,
        is_connected: row.anthropic_connected(Utc::now()),
        error: query.error,
        success: query.success.as_deref() == Some("true"),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /app/settings/anthropic
///
/// Exchange the pasted code with the session's verifier and store the
/// tokens on the user. Outcomes are reported by redirecting back to the
/// settings page with `success=true` or an `error` code.
pub async fn connect(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Session(session): Session,
    Form(input): Form<ConnectForm>,
) -> AppResult<Response> {
    let (Some(expected_state), Some(verifier)) =
        (session.oauth_state.as_deref(), session.oauth_verifier.as_deref())
    else {
        return Ok(redirect(&format!("{SETTINGS_PATH}?error=invalid_session")));
    };

    if input.code.trim().is_empty() || input.state != expected_state {
        tracing::warn!(user_id = %user.id, "Anthropic connect state mismatch");
        return Ok(redirect(&format!("{SETTINGS_PATH}?error=invalid_state")));
    }

    let token = match anthropic::exchange_token(
        &state.http,
        &state.config.oauth.anthropic_token_url,
        &input.code,
        verifier,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Anthropic token exchange failed");
            return Ok(redirect(&format!("{SETTINGS_PATH}?error=token_exchange_failed")));
        }
    };

    let tokens = AnthropicTokens {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        scopes: anthropic::granted_scopes(),
    };
    if !UserRepo::save_anthropic_tokens(&state.pool, user.id, &tokens).await? {
        return Ok(redirect("/"));
    }
    tracing::info!(user_id = %user.id, "Anthropic account connected");

    let cookie = session_cookie(&SessionData::for_user(user), &state.config.session)?;
    Ok(redirect_with_cookie(
        &format!("{SETTINGS_PATH}?success=true"),
        cookie,
    ))
}

/// DELETE /app/settings/anthropic
///
/// Forget the stored Anthropic tokens.
pub async fn disconnect(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<StatusCode> {
    if !UserRepo::clear_anthropic_tokens(&state.pool, user.id).await? {
        return Err(AppError::unauthorized());
    }
    tracing::info!(user_id = %user.id, "Anthropic account disconnected");
    Ok(StatusCode::NO_CONTENT)
}
