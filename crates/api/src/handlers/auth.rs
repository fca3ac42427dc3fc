//! Handlers for email/password auth, the provider list and logout.

use axum::extract::State;
use axum::response::Response;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::auth::session::{clear_session_cookie, session_cookie, SessionData, SessionUser};
use crate::error::{AppError, AppResult};
use crate::oauth::configured_providers;
use crate::response::{redirect_with_cookie, DataResponse};
use crate::services::accounts;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Form body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Form body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// One entry of `GET /auth/providers`.
#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    /// Path that starts the login redirect.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/register
///
/// Create an email/password account, log it in and go to the dashboard.
pub async fn register(
    State(state): State<AppState>,
    Form(input): Form<RegisterForm>,
) -> AppResult<Response> {
    require_credentials(&input.email, &input.password)?;

    let user = accounts::register_with_email(
        &state.pool,
        &input.email,
        &input.password,
        input.name.as_deref(),
    )
    .await
    .map_err(AppError::into_form_error)?;

    let session = SessionData::for_user(SessionUser::from(&user));
    let cookie = session_cookie(&session, &state.config.session)?;
    Ok(redirect_with_cookie("/app", cookie))
}

/// POST /auth/login
///
/// Check email and password, start a session and go to the dashboard.
pub async fn login(
    State(state): State<AppState>,
    Form(input): Form<LoginForm>,
) -> AppResult<Response> {
    require_credentials(&input.email, &input.password)?;

    let user = accounts::login_with_email(&state.pool, &input.email, &input.password)
        .await
        .map_err(AppError::into_form_error)?;
    tracing::info!(user_id = %user.id, "Email login");

    let session = SessionData::for_user(SessionUser::from(&user));
    let cookie = session_cookie(&session, &state.config.session)?;
    Ok(redirect_with_cookie("/app", cookie))
}

/// GET /auth/providers
///
/// Login providers with credentials configured, in display order.
pub async fn providers(State(state): State<AppState>) -> Json<DataResponse<Vec<ProviderInfo>>> {
    let data = configured_providers(&state.config.oauth)
        .into_iter()
        .map(|name| ProviderInfo {
            name,
            url: format!("/oauth/{name}"),
        })
        .collect();
    Json(DataResponse { data })
}

/// POST /oauth/logout
///
/// Drop the session cookie and go home. Only POST is routed, so a GET gets
/// a 405 and a stray link cannot log anyone out.
pub async fn logout(State(state): State<AppState>) -> Response {
    redirect_with_cookie("/", clear_session_cookie(&state.config.session))
}

fn require_credentials(email: &str, password: &str) -> AppResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }
    Ok(())
}
