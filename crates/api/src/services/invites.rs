//! Workspace invitations.
//!
//! Lifecycle: `pending` -> `accepted` | `declined` | `expired`. An invite
//! older than its `expires_at` is only marked `expired` when someone tries
//! to accept it.

use chrono::Utc;
use nvoi_core::accounts::validate_email;
use nvoi_core::error::CoreError;
use nvoi_core::invites::{
    check_acceptable, check_declinable, invite_expiry, normalize_email, AcceptRejection,
    InviteRole,
};
use nvoi_core::types::DbId;
use nvoi_db::models::invite::{CreateInvite, WorkspaceInvite};
use nvoi_db::models::user::User;
use nvoi_db::repositories::{InviteRepo, UserRepo};
use nvoi_db::DbPool;

use crate::auth::random_token;
use crate::error::{AppError, AppResult};

/// Random bytes behind each invite token.
const INVITE_TOKEN_BYTES: usize = 32;

/// Issue a pending invite for `email` into `workspace_id`.
///
/// If an account already uses that address it is linked up front. Fails if
/// the address already has a pending invite to the same workspace.
pub async fn create_workspace_invite(
    pool: &DbPool,
    workspace_id: DbId,
    email: &str,
    invited_by_user_id: DbId,
    role: InviteRole,
) -> AppResult<WorkspaceInvite> {
    let email = normalize_email(email);
    validate_email(&email)?;

    if InviteRepo::find_pending_for_email(pool, workspace_id, &email)
        .await?
        .is_some()
    {
        return Err(CoreError::Conflict("Invite already pending for this email".into()).into());
    }

    let existing_user = UserRepo::find_by_email(pool, &email).await?;

    let invite = InviteRepo::create(
        pool,
        &CreateInvite {
            workspace_id,
            email,
            user_id: existing_user.map(|u| u.id),
            invited_by_user_id,
            token: random_token(INVITE_TOKEN_BYTES),
            role,
            expires_at: invite_expiry(Utc::now()),
        },
    )
    .await?;

    tracing::info!(invite_id = %invite.id, %workspace_id, role = %role, "Workspace invite created");
    Ok(invite)
}

/// Look up an invite by its token.
pub async fn invite_by_token(pool: &DbPool, token: &str) -> AppResult<WorkspaceInvite> {
    InviteRepo::find_by_token(pool, token)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite not found".into()))
}

/// Accept the invite behind `token` as `user`.
///
/// A pending invite past its expiry is marked `expired` and rejected. The
/// accepting account's email must match the invited address.
pub async fn accept_invite(pool: &DbPool, token: &str, user: &User) -> AppResult<WorkspaceInvite> {
    let invite = invite_by_token(pool, token).await?;
    let status = invite
        .status()
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let acceptor_email = user.email.as_deref().unwrap_or_default();
    match check_acceptable(status, invite.expires_at, &invite.email, acceptor_email, Utc::now()) {
        Ok(()) => {}
        Err(AcceptRejection::Expired) => {
            InviteRepo::mark_expired(pool, invite.id).await?;
            tracing::info!(invite_id = %invite.id, "Invite expired on accept");
            return Err(CoreError::from(AcceptRejection::Expired).into());
        }
        Err(rejection) => return Err(CoreError::from(rejection).into()),
    }

    // The conditional update loses only to a concurrent accept/decline or
    // to expiry in the meantime.
    let accepted = InviteRepo::accept(pool, invite.id, user.id)
        .await?
        .ok_or_else(|| CoreError::from(AcceptRejection::NotPending))?;

    tracing::info!(invite_id = %accepted.id, user_id = %user.id, workspace_id = %accepted.workspace_id, "Invite accepted");
    Ok(accepted)
}

/// Decline the invite behind `token`.
pub async fn decline_invite(pool: &DbPool, token: &str) -> AppResult<WorkspaceInvite> {
    let invite = invite_by_token(pool, token).await?;
    let status = invite
        .status()
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    check_declinable(status)?;

    let declined = InviteRepo::decline(pool, invite.id)
        .await?
        .ok_or_else(|| CoreError::from(AcceptRejection::NotPending))?;
    tracing::info!(invite_id = %declined.id, "Invite declined");
    Ok(declined)
}

/// Delete an invite, provided it belongs to `workspace_id`.
pub async fn cancel_invite(pool: &DbPool, workspace_id: DbId, invite_id: DbId) -> AppResult<()> {
    if !InviteRepo::delete_in_workspace(pool, workspace_id, invite_id).await? {
        return Err(CoreError::not_found("Invite", invite_id).into());
    }
    tracing::info!(%invite_id, %workspace_id, "Invite cancelled");
    Ok(())
}

/// All invites of a workspace, newest first.
pub async fn workspace_invites(pool: &DbPool, workspace_id: DbId) -> AppResult<Vec<WorkspaceInvite>> {
    Ok(InviteRepo::list_for_workspace(pool, workspace_id).await?)
}
