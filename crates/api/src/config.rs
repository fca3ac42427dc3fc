use std::str::FromStr;

use crate::auth::session::SessionConfig;
use crate::oauth::OAuthConfig;

/// Everything the API process reads from its environment.
///
/// Only `SESSION_SECRET` is mandatory; the rest default to a local setup
/// with the front-end dev server on port 5173.
///
/// | variable               | default                 |
/// |------------------------|-------------------------|
/// | `HOST`                 | `0.0.0.0`               |
/// | `PORT`                 | `3000`                  |
/// | `CORS_ORIGINS`         | `http://localhost:5173` |
/// | `REQUEST_TIMEOUT_SECS` | `30`                    |
/// | `PUBLIC_BASE_URL`      | `http://localhost:3000` |
///
/// Session and provider variables are listed on [`SessionConfig`] and
/// [`OAuthConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to make credentialed requests.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Origin used in links sent to users, without trailing slash.
    pub public_base_url: String,
    pub session: SessionConfig,
    pub oauth: OAuthConfig,
}

impl ServerConfig {
    /// # Panics
    ///
    /// On a malformed number or a missing session secret, so a bad
    /// deployment fails at startup rather than on the first request.
    pub fn from_env() -> Self {
        let public_base_url = env_or("PUBLIC_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parsed_env("PORT", 3000),
            cors_origins: split_list(&env_or("CORS_ORIGINS", "http://localhost:5173")),
            request_timeout_secs: parsed_env("REQUEST_TIMEOUT_SECS", 30),
            session: SessionConfig::from_env(),
            oauth: OAuthConfig::from_env(&public_base_url),
            public_base_url,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} is not valid ({raw:?}): {e}")),
        Err(_) => default,
    }
}

/// Comma-separated list, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
