//! Workspace invite model and DTOs.

use nvoi_core::invites::{InviteRole, InviteStatus};
use nvoi_core::status::UnknownVariant;
use nvoi_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workspace_invites` table.
///
/// `user_id` is the account the invite is linked to: an existing account
/// with the invited email at creation time, or the acceptor afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInvite {
    pub id: DbId,
    pub workspace_id: DbId,
    pub email: String,
    pub user_id: Option<DbId>,
    pub invited_by_user_id: DbId,
    pub token: String,
    pub role: String,
    pub status: String,
    pub expires_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkspaceInvite {
    pub fn status(&self) -> Result<InviteStatus, UnknownVariant> {
        self.status.parse()
    }

    pub fn role(&self) -> Result<InviteRole, UnknownVariant> {
        self.role.parse()
    }
}

/// DTO for issuing a new invite.
#[derive(Debug)]
pub struct CreateInvite {
    pub workspace_id: DbId,
    pub email: String,
    pub user_id: Option<DbId>,
    pub invited_by_user_id: DbId,
    pub token: String,
    pub role: InviteRole,
    pub expires_at: Timestamp,
}
