//! Repository for the `users` table.

use nvoi_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{AnthropicTokens, CreatePasswordUser, OAuthAccount, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, login, name, avatar_url, provider, remote_id, access_token, \
                       password_hash, anthropic_access_token, anthropic_refresh_token, \
                       anthropic_expires_at, anthropic_scopes, created_at, last_login_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert an email/password account, returning the created row.
    pub async fn create_with_password(
        pool: &PgPool,
        input: &CreatePasswordUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, email, login, name, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(DbId::now_v7())
            .bind(&input.email)
            .bind(&input.login)
            .bind(&input.name)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Insert an account created by a first OAuth login.
    ///
    /// `login` falls back to the email's local part when the provider has no
    /// handle of its own.
    pub async fn create_oauth(pool: &PgPool, input: &OAuthAccount) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users
                (id, email, login, name, avatar_url, provider, remote_id, access_token, last_login_at)
             VALUES ($1, $2, COALESCE($3, split_part($2, '@', 1)), $4, $5, $6, $7, $8, NOW())
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(DbId::now_v7())
            .bind(&input.email)
            .bind(&input.login)
            .bind(&input.name)
            .bind(&input.avatar_url)
            .bind(&input.provider)
            .bind(&input.remote_id)
            .bind(&input.access_token)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Link an OAuth identity onto an existing account.
    ///
    /// Provider, remote id and token are always replaced. Profile fields the
    /// provider did not return keep their stored values.
    pub async fn link_oauth_account(
        pool: &PgPool,
        id: DbId,
        input: &OAuthAccount,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                provider = $2,
                remote_id = $3,
                access_token = $4,
                login = COALESCE($5, login),
                name = COALESCE($6, name),
                avatar_url = COALESCE($7, avatar_url),
                last_login_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.provider)
            .bind(&input.remote_id)
            .bind(&input.access_token)
            .bind(&input.login)
            .bind(&input.name)
            .bind(&input.avatar_url)
            .fetch_optional(pool)
            .await
    }

    /// Stamp `last_login_at` after a successful password login.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Store the tokens from a completed Anthropic PKCE exchange.
    ///
    /// Returns `false` if no row with the given `id` exists.
    pub async fn save_anthropic_tokens(
        pool: &PgPool,
        id: DbId,
        tokens: &AnthropicTokens,
    ) -> Result<bool, sqlx::Error> {
        let scopes = serde_json::json!(tokens.scopes);
        let result = sqlx::query(
            "UPDATE users SET
                anthropic_access_token = $2,
                anthropic_refresh_token = $3,
                anthropic_expires_at = $4,
                anthropic_scopes = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(scopes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Forget the stored Anthropic connection.
    pub async fn clear_anthropic_tokens(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                anthropic_access_token = NULL,
                anthropic_refresh_token = NULL,
                anthropic_expires_at = NULL,
                anthropic_scopes = NULL
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
