//! Handlers for workspace invites: the owner's management page and the
//! public `/invite/{token}` landing page.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Form, Json};
use nvoi_core::invites::InviteRole;
use nvoi_core::types::DbId;
use nvoi_db::models::invite::WorkspaceInvite;
use nvoi_db::models::workspace::Workspace;
use nvoi_db::repositories::{UserRepo, WorkspaceRepo};
use nvoi_events::{InviteEmail, InviteMailer};
use serde::{Deserialize, Serialize};

use crate::auth::session::SessionUser;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeUser, RequireUser};
use crate::response::redirect;
use crate::services::{invites, workspaces};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct InvitesResponse {
    pub workspace: Workspace,
    pub invites: Vec<WorkspaceInvite>,
}

/// Form body for `POST /app/workspace/invites`.
#[derive(Debug, Deserialize)]
pub struct InviteForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct InviteCreatedResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Loader data for `/invite/{token}`.
#[derive(Debug, Serialize)]
pub struct InviteViewResponse {
    pub invite: WorkspaceInvite,
    pub workspace: Option<Workspace>,
    pub user: Option<SessionUser>,
}

/// Form body for `POST /invite/{token}`.
#[derive(Debug, Deserialize)]
pub struct InviteActionForm {
    #[serde(default)]
    pub action: String,
}

// ---------------------------------------------------------------------------
// Workspace owner
// ---------------------------------------------------------------------------

/// GET /app/workspace/invites
///
/// All invites of the user's first workspace.
pub async fn list_invites(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> AppResult<Json<InvitesResponse>> {
    let workspace = first_workspace(&state, user.id).await?;
    let invites = invites::workspace_invites(&state.pool, workspace.id).await?;
    Ok(Json(InvitesResponse { workspace, invites }))
}

/// POST /app/workspace/invites
///
/// Invite an address into the user's first workspace and email the link
/// when SMTP is configured.
pub async fn create_invite(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(input): Form<InviteForm>,
) -> AppResult<Json<InviteCreatedResponse>> {
    if input.email.trim().is_empty() || input.role.trim().is_empty() {
        return Err(AppError::BadRequest("Email and role are required".into()));
    }
    let role: InviteRole = input
        .role
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Role must be member or admin".into()))?;

    let workspace = first_workspace(&state, user.id).await?;
    let invite =
        invites::create_workspace_invite(&state.pool, workspace.id, &input.email, user.id, role)
            .await
            .map_err(AppError::into_form_error)?;

    if let Some(mailer) = &state.mailer {
        let email = InviteEmail {
            to: invite.email.clone(),
            inviter_name: user.name.clone().unwrap_or_else(|| user.login.clone()),
            workspace_label: workspace.label.clone(),
            token: invite.token.clone(),
            base_url: state.config.public_base_url.clone(),
        };
        send_in_background(Arc::clone(mailer), email);
    }

    Ok(Json(InviteCreatedResponse {
        success: true,
        message: "Invitation sent!",
    }))
}

/// DELETE /app/workspace/invites/{id}
pub async fn cancel_invite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(invite_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let workspace = first_workspace(&state, user.id).await?;
    invites::cancel_invite(&state.pool, workspace.id, invite_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Invitee
// ---------------------------------------------------------------------------

/// GET /invite/{token}
///
/// The invite, its workspace and whoever is logged in (if anyone).
pub async fn view_invite(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
) -> AppResult<Json<InviteViewResponse>> {
    let invite = invites::invite_by_token(&state.pool, &token).await?;
    let workspace = WorkspaceRepo::find_by_id(&state.pool, invite.workspace_id).await?;
    Ok(Json(InviteViewResponse {
        invite,
        workspace,
        user,
    }))
}

/// POST /invite/{token}
///
/// `action=accept` joins the workspace and goes to the dashboard;
/// `action=decline` goes home. Anonymous visitors are sent to register
/// first, carrying the token along.
pub async fn respond_to_invite(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    Form(input): Form<InviteActionForm>,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(redirect(&register_url(&token)?));
    };

    match input.action.as_str() {
        "accept" => {
            let Some(row) = UserRepo::find_by_id(&state.pool, user.id).await? else {
                return Ok(redirect("/"));
            };
            invites::accept_invite(&state.pool, &token, &row)
                .await
                .map_err(AppError::into_form_error)?;
            Ok(redirect("/app"))
        }
        "decline" => {
            invites::decline_invite(&state.pool, &token)
                .await
                .map_err(AppError::into_form_error)?;
            Ok(redirect("/"))
        }
        _ => Ok(redirect("/")),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn first_workspace(state: &AppState, user_id: DbId) -> AppResult<Workspace> {
    workspaces::user_workspaces(&state.pool, user_id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("No workspace found".into()))
}

/// `/auth/register?invite=<token>` with the token query-encoded.
fn register_url(token: &str) -> AppResult<String> {
    let mut url = reqwest::Url::parse("http://localhost/auth/register")
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    url.query_pairs_mut().append_pair("invite", token);
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

fn send_in_background(mailer: Arc<InviteMailer>, email: InviteEmail) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email).await {
            tracing::warn!(to = %email.to, error = %e, "Failed to send invite email");
        }
    });
}
