//! Repository for the `workspaces` and `workspace_users` tables.

use nvoi_core::invites::InviteRole;
use nvoi_core::types::DbId;
use sqlx::PgPool;

use crate::models::workspace::{Workspace, WorkspaceMember};

/// Column list for `workspaces` queries.
const COLUMNS: &str = "id, label, created_at, updated_at";

/// Same columns, qualified for joins against `workspace_users`.
const JOINED_COLUMNS: &str = "w.id, w.label, w.created_at, w.updated_at";

/// Column list for `workspace_users` queries.
const MEMBER_COLUMNS: &str = "id, workspace_id, user_id, role, created_at, updated_at";

/// Provides operations for workspaces and their memberships.
pub struct WorkspaceRepo;

impl WorkspaceRepo {
    /// Create a workspace and make `owner_id` its admin, in one transaction.
    pub async fn create_with_owner(
        pool: &PgPool,
        label: &str,
        owner_id: DbId,
    ) -> Result<Workspace, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let workspace = Self::create_with_owner_inner(&mut tx, label, owner_id).await?;
        tx.commit().await?;
        Ok(workspace)
    }

    /// Return the user's first workspace, creating one labelled `label` if
    /// the user belongs to none.
    ///
    /// A transaction-scoped advisory lock on the user id serializes
    /// concurrent calls, so a user racing two first logins still ends up
    /// with exactly one workspace. The boolean is `true` when a workspace
    /// was created.
    pub async fn ensure_for_user(
        pool: &PgPool,
        user_id: DbId,
        label: &str,
    ) -> Result<(Workspace, bool), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM workspaces w \
             JOIN workspace_users wu ON wu.workspace_id = w.id \
             WHERE wu.user_id = $1 \
             ORDER BY wu.created_at ASC \
             LIMIT 1"
        );
        let existing = sqlx::query_as::<_, Workspace>(&query)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let result = match existing {
            Some(workspace) => (workspace, false),
            None => (Self::create_with_owner_inner(&mut tx, label, user_id).await?, true),
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Find a workspace by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workspace>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspaces WHERE id = $1");
        sqlx::query_as::<_, Workspace>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The workspace the user joined first.
    pub async fn first_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Workspace>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM workspaces w \
             JOIN workspace_users wu ON wu.workspace_id = w.id \
             WHERE wu.user_id = $1 \
             ORDER BY wu.created_at ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Workspace>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Every workspace the user is a member of, oldest membership first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Workspace>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM workspaces w \
             JOIN workspace_users wu ON wu.workspace_id = w.id \
             WHERE wu.user_id = $1 \
             ORDER BY wu.created_at ASC"
        );
        sqlx::query_as::<_, Workspace>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// All memberships of a workspace.
    pub async fn list_members(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<Vec<WorkspaceMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM workspace_users \
             WHERE workspace_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, WorkspaceMember>(&query)
            .bind(workspace_id)
            .fetch_all(pool)
            .await
    }

    /// Whether the user belongs to the workspace.
    pub async fn is_member(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                SELECT 1 FROM workspace_users WHERE workspace_id = $1 AND user_id = $2 \
             )",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Add a member inside an open transaction. Existing memberships are
    /// left untouched; returns `true` if a row was inserted.
    pub(crate) async fn add_member_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        workspace_id: DbId,
        user_id: DbId,
        role: InviteRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO workspace_users (id, workspace_id, user_id, role) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_workspace_users_member DO NOTHING",
        )
        .bind(DbId::now_v7())
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_with_owner_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        label: &str,
        owner_id: DbId,
    ) -> Result<Workspace, sqlx::Error> {
        let query = format!(
            "INSERT INTO workspaces (id, label) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let workspace = sqlx::query_as::<_, Workspace>(&query)
            .bind(DbId::now_v7())
            .bind(label)
            .fetch_one(&mut **tx)
            .await?;

        Self::add_member_inner(tx, workspace.id, owner_id, InviteRole::Admin).await?;
        Ok(workspace)
    }
}
