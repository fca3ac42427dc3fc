//! Workspace provisioning.

use nvoi_core::accounts::default_workspace_label;
use nvoi_core::types::DbId;
use nvoi_db::models::workspace::Workspace;
use nvoi_db::repositories::WorkspaceRepo;
use nvoi_db::DbPool;

/// Make sure the user belongs to at least one workspace.
///
/// Returns the user's first workspace, creating `"<name>'s Workspace"` (or
/// `"My Workspace"` without a name) when there is none. Idempotent and safe
/// to race.
pub async fn ensure_user_has_workspace(
    pool: &DbPool,
    user_id: DbId,
    display_name: Option<&str>,
) -> Result<Workspace, sqlx::Error> {
    let label = default_workspace_label(display_name);
    let (workspace, created) = WorkspaceRepo::ensure_for_user(pool, user_id, &label).await?;
    if created {
        tracing::info!(%user_id, workspace_id = %workspace.id, label = %workspace.label, "Created default workspace");
    }
    Ok(workspace)
}

/// Every workspace the user is a member of, oldest membership first.
pub async fn user_workspaces(pool: &DbPool, user_id: DbId) -> Result<Vec<Workspace>, sqlx::Error> {
    WorkspaceRepo::list_for_user(pool, user_id).await
}
