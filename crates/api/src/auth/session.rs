//! Signed cookie sessions.
//!
//! The whole session lives client-side in the `__session` cookie as an
//! HS256 JWT: the logged-in [`SessionUser`] plus transient OAuth values
//! (`oauth_state`, `oauth_verifier`) that must survive one redirect round
//! trip. A missing, tampered or expired cookie reads as an empty session.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use nvoi_core::types::DbId;
use nvoi_db::models::user::User;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cookie name carrying the session token.
pub const SESSION_COOKIE: &str = "__session";

/// Session lifetime: seven days.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The user identity stored in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: DbId,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Everything a session can hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    /// CSRF state for an OAuth redirect in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,
    /// PKCE verifier for the Anthropic connect flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_verifier: Option<String>,
}

impl SessionData {
    /// A fresh session holding only `user`.
    pub fn for_user(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    data: SessionData,
    iat: i64,
    exp: i64,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for session signing and cookie attributes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC-SHA256 secret used to sign and verify session tokens.
    pub secret: String,
    /// Add the `Secure` attribute to the cookie.
    pub secure: bool,
    /// Cookie and token lifetime in seconds.
    pub max_age_secs: i64,
}

impl SessionConfig {
    /// Load session configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default |
    /// |-------------------------|----------|---------|
    /// | `SESSION_SECRET`        | **yes**  | --      |
    /// | `SESSION_COOKIE_SECURE` | no       | `false` |
    ///
    /// # Panics
    ///
    /// Panics if `SESSION_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("SESSION_SECRET").expect("SESSION_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "SESSION_SECRET must not be empty");

        let secure: bool = std::env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("SESSION_COOKIE_SECURE must be true or false");

        Self {
            secret,
            secure,
            max_age_secs: SESSION_MAX_AGE_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Sign `data` into a session token valid for `config.max_age_secs`.
pub fn encode_session(
    data: &SessionData,
    config: &SessionConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        data: data.clone(),
        iat: now,
        exp: now + config.max_age_secs,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a session token and return its payload.
pub fn decode_session(
    token: &str,
    config: &SessionConfig,
) -> Result<SessionData, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims.data)
}

/// Read the session from request headers; anything unusable is empty.
pub fn session_from_headers(headers: &HeaderMap, config: &SessionConfig) -> SessionData {
    let Some(token) = cookie_value(headers, SESSION_COOKIE) else {
        return SessionData::default();
    };
    match decode_session(token, config) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            SessionData::default()
        }
    }
}

/// `Set-Cookie` value persisting `data`.
pub fn session_cookie(data: &SessionData, config: &SessionConfig) -> Result<HeaderValue, AppError> {
    let token = encode_session(data, config)
        .map_err(|e| AppError::InternalError(format!("Session encoding error: {e}")))?;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; {}",
        cookie_attributes(config, config.max_age_secs)
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::InternalError(format!("Invalid session cookie: {e}")))
}

/// `Set-Cookie` value that removes the session.
pub fn clear_session_cookie(config: &SessionConfig) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}=; {}", cookie_attributes(config, 0));
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("__session=; Max-Age=0"))
}

fn cookie_attributes(config: &SessionConfig, max_age: i64) -> String {
    let mut attrs = format!("HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}");
    if config.secure {
        attrs.push_str("; Secure");
    }
    attrs
}

/// Value of cookie `name` across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
