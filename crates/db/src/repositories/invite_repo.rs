//! Repository for the `workspace_invites` table.
//!
//! Status transitions are conditional updates on `status = 'pending'`, so two
//! concurrent accept/decline requests for the same token cannot both win.

use nvoi_core::invites::{InviteRole, InviteStatus};
use nvoi_core::types::DbId;
use sqlx::PgPool;

use crate::models::invite::{CreateInvite, WorkspaceInvite};
use crate::repositories::WorkspaceRepo;

/// Column list for `workspace_invites` queries.
const COLUMNS: &str = "id, workspace_id, email, user_id, invited_by_user_id, token, role, \
                       status, expires_at, accepted_at, created_at, updated_at";

/// Provides CRUD operations and status transitions for invites.
pub struct InviteRepo;

impl InviteRepo {
    /// Insert a new pending invite.
    pub async fn create(
        pool: &PgPool,
        input: &CreateInvite,
    ) -> Result<WorkspaceInvite, sqlx::Error> {
        let query = format!(
            "INSERT INTO workspace_invites \
                (id, workspace_id, email, user_id, invited_by_user_id, token, role, status, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(DbId::now_v7())
            .bind(input.workspace_id)
            .bind(&input.email)
            .bind(input.user_id)
            .bind(input.invited_by_user_id)
            .bind(&input.token)
            .bind(input.role.as_str())
            .bind(InviteStatus::Pending.as_str())
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an invite by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspace_invites WHERE id = $1");
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an invite by its secret token.
    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspace_invites WHERE token = $1");
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Find a pending invite for `email` in the workspace, if any.
    pub async fn find_pending_for_email(
        pool: &PgPool,
        workspace_id: DbId,
        email: &str,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workspace_invites \
             WHERE workspace_id = $1 AND LOWER(email) = LOWER($2) AND status = $3 \
             LIMIT 1"
        );
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(workspace_id)
            .bind(email)
            .bind(InviteStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// All invites of a workspace, newest first, regardless of status.
    pub async fn list_for_workspace(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<Vec<WorkspaceInvite>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workspace_invites \
             WHERE workspace_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(workspace_id)
            .fetch_all(pool)
            .await
    }

    /// Accept a pending, unexpired invite on behalf of `user_id`.
    ///
    /// In one transaction: flips the invite to `accepted` (linking the user
    /// and stamping `accepted_at`) and adds the membership with the invite's
    /// role. An existing membership is kept as is. Returns `None` when the
    /// invite was no longer pending or had expired; nothing is written then.
    pub async fn accept(
        pool: &PgPool,
        invite_id: DbId,
        user_id: DbId,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE workspace_invites \
             SET status = $3, accepted_at = NOW(), user_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $4 AND expires_at >= NOW() \
             RETURNING {COLUMNS}"
        );
        let accepted = sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(invite_id)
            .bind(user_id)
            .bind(InviteStatus::Accepted.as_str())
            .bind(InviteStatus::Pending.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(invite) = accepted else {
            tx.rollback().await?;
            return Ok(None);
        };

        let role = invite.role().unwrap_or(InviteRole::Member);
        WorkspaceRepo::add_member_inner(&mut tx, invite.workspace_id, user_id, role).await?;

        tx.commit().await?;
        Ok(Some(invite))
    }

    /// Move a pending invite to `declined`. Returns `None` if it was not pending.
    pub async fn decline(
        pool: &PgPool,
        invite_id: DbId,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        Self::transition_from_pending(pool, invite_id, InviteStatus::Declined).await
    }

    /// Move a pending invite to `expired`. Returns `None` if it was not pending.
    pub async fn mark_expired(
        pool: &PgPool,
        invite_id: DbId,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        Self::transition_from_pending(pool, invite_id, InviteStatus::Expired).await
    }

    /// Delete an invite belonging to `workspace_id`. Returns `true` if a row
    /// was removed.
    pub async fn delete_in_workspace(
        pool: &PgPool,
        workspace_id: DbId,
        invite_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM workspace_invites WHERE id = $1 AND workspace_id = $2")
                .bind(invite_id)
                .bind(workspace_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transition_from_pending(
        pool: &PgPool,
        invite_id: DbId,
        to: InviteStatus,
    ) -> Result<Option<WorkspaceInvite>, sqlx::Error> {
        let query = format!(
            "UPDATE workspace_invites SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkspaceInvite>(&query)
            .bind(invite_id)
            .bind(to.as_str())
            .bind(InviteStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }
}
