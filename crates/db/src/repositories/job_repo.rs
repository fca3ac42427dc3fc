//! Repository for the `jobs` table.
//!
//! Status literals come from `nvoi_core::jobs::JobStatus`; nothing here
//! spells a status string by hand.

use nvoi_core::jobs::JobStatus;
use nvoi_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, type, key, status, payload, result, error, \
    created_at, started_at, completed_at";

/// Provides CRUD operations and lifecycle updates for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `queued` status.
    pub async fn create(pool: &PgPool, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, user_id, type, key, status, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(DbId::now_v7())
            .bind(input.user_id)
            .bind(input.job_type.as_str())
            .bind(&input.key)
            .bind(JobStatus::Queued.as_str())
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Find a job by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's most recent jobs, newest first.
    pub async fn list_recent_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Move a job to `started`, stamp `started_at` and clear anything a
    /// previous delivery left behind.
    ///
    /// Returns `false` if the job does not exist or is already finished.
    pub async fn mark_started(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs SET status = $2, started_at = NOW(), \
                 result = NULL, error = NULL, completed_at = NULL \
             WHERE id = $1 AND status <> ALL($3)",
        )
        .bind(job_id)
        .bind(JobStatus::Started.as_str())
        .bind(terminal_statuses())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark a job as completed with its result payload.
    ///
    /// Returns `false` if the job does not exist or is already finished.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs SET status = $2, result = $3, error = NULL, completed_at = NOW() \
             WHERE id = $1 AND status <> ALL($4)",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.as_str())
        .bind(result)
        .bind(terminal_statuses())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark a job as failed with an error message.
    ///
    /// Returns `false` if the job does not exist or is already finished.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs SET status = $2, error = $3, completed_at = NOW() \
             WHERE id = $1 AND status <> ALL($4)",
        )
        .bind(job_id)
        .bind(JobStatus::Error.as_str())
        .bind(error)
        .bind(terminal_statuses())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }
}

/// Literals of the statuses no update may leave.
fn terminal_statuses() -> Vec<&'static str> {
    JobStatus::ALL
        .iter()
        .filter(|status| status.is_terminal())
        .map(|status| status.as_str())
        .collect()
}
