//! OAuth login and the Anthropic account connection.
//!
//! - [`provider`] -- the [`OAuthProvider`] trait and shared token/user types.
//! - [`github`], [`google`], [`auth0`] -- authorization-code providers.
//! - [`registry`] -- provider lookup by name and configuration checks.
//! - [`anthropic`] -- PKCE flow with manual code entry.

pub mod anthropic;
pub mod auth0;
pub mod github;
pub mod google;
pub mod provider;
pub mod registry;

pub use provider::{NormalizedUser, OAuthProvider, TokenResponse};
pub use registry::{configured_providers, is_provider_configured, provider_for};

use nvoi_db::models::user::{OAuthAccount, User};
use nvoi_db::DbPool;

use crate::services::accounts::find_or_create_oauth_user;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failures while talking to an OAuth provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("OAuth provider \"{0}\" not configured")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} token exchange failed: {message}")]
    TokenExchange {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} user fetch failed: {message}")]
    UserInfo {
        provider: &'static str,
        message: String,
    },

    #[error("No verified email found in {0} account")]
    MissingEmail(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Client id and secret of an authorization-code provider.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Auth0 needs a tenant domain on top of the credentials.
#[derive(Debug, Clone)]
pub struct Auth0Config {
    pub client_id: String,
    pub client_secret: String,
    /// Tenant domain, with or without scheme (e.g. `tenant.us.auth0.com`).
    pub domain: String,
}

/// Login provider configuration. A provider whose variables are not all
/// set is disabled.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub github: Option<ClientCredentials>,
    pub google: Option<ClientCredentials>,
    pub auth0: Option<Auth0Config>,
    /// Origin the providers redirect back to, without trailing slash.
    pub redirect_base: String,
    /// Token endpoint for the Anthropic PKCE exchange.
    pub anthropic_token_url: String,
}

impl OAuthConfig {
    /// Load provider configuration from environment variables.
    ///
    /// | Env Var                                      | Default            |
    /// |----------------------------------------------|--------------------|
    /// | `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`  | -- (disabled)      |
    /// | `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`  | -- (disabled)      |
    /// | `AUTH0_CLIENT_ID` / `AUTH0_CLIENT_SECRET`    | -- (disabled)      |
    /// | `AUTH0_DOMAIN`                               | -- (disabled)      |
    /// | `OAUTH_REDIRECT_BASE`                        | `PUBLIC_BASE_URL`  |
    pub fn from_env(public_base_url: &str) -> Self {
        let auth0 = match (credentials_from_env("AUTH0"), non_empty_env("AUTH0_DOMAIN")) {
            (Some(creds), Some(domain)) => Some(Auth0Config {
                client_id: creds.client_id,
                client_secret: creds.client_secret,
                domain,
            }),
            _ => None,
        };

        Self {
            github: credentials_from_env("GITHUB"),
            google: credentials_from_env("GOOGLE"),
            auth0,
            redirect_base: non_empty_env("OAUTH_REDIRECT_BASE")
                .unwrap_or_else(|| public_base_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            anthropic_token_url: anthropic::TOKEN_URL.to_string(),
        }
    }

    /// Callback URL registered with `provider`.
    pub fn redirect_uri(&self, provider: &str) -> String {
        format!("{}/oauth/{provider}/callback", self.redirect_base)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn credentials_from_env(prefix: &str) -> Option<ClientCredentials> {
    Some(ClientCredentials {
        client_id: non_empty_env(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: non_empty_env(&format!("{prefix}_CLIENT_SECRET"))?,
    })
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// Finish an authorization-code login: exchange `code`, fetch the profile,
/// and find-or-create the local account (linking by email).
pub async fn handle_oauth_callback(
    pool: &DbPool,
    http: &reqwest::Client,
    provider: &dyn OAuthProvider,
    code: &str,
    redirect_uri: &str,
) -> Result<User, OAuthError> {
    let token = provider.exchange_token(http, code, redirect_uri).await?;
    let profile = provider.fetch_user_info(http, &token.access_token).await?;

    let account = OAuthAccount {
        provider: provider.name().to_string(),
        remote_id: profile.id.clone(),
        access_token: token.access_token,
        email: profile.email.clone(),
        login: profile.login.clone(),
        name: Some(profile.name.clone()),
        avatar_url: profile.avatar_url.clone(),
    };

    let display_name = Some(profile.name.as_str())
        .filter(|name| !name.is_empty())
        .or(profile.login.as_deref());

    let user = find_or_create_oauth_user(pool, &account, display_name).await?;
    tracing::info!(user_id = %user.id, provider = provider.name(), "OAuth login");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_joins_base_and_provider() {
        let config = OAuthConfig {
            github: None,
            google: None,
            auth0: None,
            redirect_base: "https://nvoi.app".to_string(),
            anthropic_token_url: anthropic::TOKEN_URL.to_string(),
        };
        assert_eq!(
            config.redirect_uri("github"),
            "https://nvoi.app/oauth/github/callback"
        );
    }

    #[test]
    fn error_messages_name_the_provider() {
        let err = OAuthError::TokenExchange {
            provider: "GitHub",
            message: "bad_verification_code".into(),
        };
        assert_eq!(err.to_string(), "GitHub token exchange failed: bad_verification_code");
        assert_eq!(
            OAuthError::MissingEmail("GitHub").to_string(),
            "No verified email found in GitHub account"
        );
    }
}
