//! User entity model and DTOs.

use nvoi_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Carries password hash and provider tokens, so it is never serialized
/// directly. The API layer builds its own session profile from it.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: Option<String>,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Option<String>,
    pub remote_id: Option<String>,
    pub access_token: Option<String>,
    pub password_hash: Option<String>,
    pub anthropic_access_token: Option<String>,
    pub anthropic_refresh_token: Option<String>,
    pub anthropic_expires_at: Option<Timestamp>,
    pub anthropic_scopes: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
}

impl User {
    /// An Anthropic connection counts only while its access token is unexpired.
    pub fn anthropic_connected(&self, now: Timestamp) -> bool {
        self.anthropic_access_token.is_some()
            && self.anthropic_expires_at.is_some_and(|exp| exp > now)
    }
}

/// DTO for a user signing up with email and password.
#[derive(Debug)]
pub struct CreatePasswordUser {
    pub email: String,
    pub login: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Profile and credentials returned by an OAuth provider.
#[derive(Debug)]
pub struct OAuthAccount {
    pub provider: String,
    pub remote_id: String,
    pub access_token: String,
    pub email: String,
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Tokens issued by the Anthropic PKCE exchange.
#[derive(Debug)]
pub struct AnthropicTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `None` when the token endpoint omitted `expires_in`.
    pub expires_at: Option<Timestamp>,
    pub scopes: Vec<String>,
}
