//! GitHub login: JSON token exchange, `/user` profile, and a fallback to
//! `/user/emails` when the profile email is private.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;

use crate::oauth::provider::{error_for_status, url_with_params, RawTokenResponse};
use crate::oauth::{ClientCredentials, NormalizedUser, OAuthError, OAuthProvider, TokenResponse};

const DEFAULT_SCOPE: &str = "read:user user:email";
const API_USER_AGENT: &str = "nvoi-app";
const API_VERSION: &str = "2022-11-28";
const PROVIDER: &str = "GitHub";

/// GitHub endpoint URLs; overridable for tests.
#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    pub authorize: String,
    pub token: String,
    pub user: String,
    pub emails: String,
}

impl Default for GitHubEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://github.com/login/oauth/authorize".into(),
            token: "https://github.com/login/oauth/access_token".into(),
            user: "https://api.github.com/user".into(),
            emails: "https://api.github.com/user/emails".into(),
        }
    }
}

pub struct GitHubProvider {
    credentials: ClientCredentials,
    endpoints: GitHubEndpoints,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GitHubProvider {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self::with_endpoints(credentials, GitHubEndpoints::default())
    }

    pub fn with_endpoints(credentials: ClientCredentials, endpoints: GitHubEndpoints) -> Self {
        Self {
            credentials,
            endpoints,
        }
    }

    fn api_get(&self, http: &reqwest::Client, url: &str, access_token: &str) -> reqwest::RequestBuilder {
        http.get(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(USER_AGENT, API_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Primary verified address, used when the profile email is private.
    async fn primary_email(&self, http: &reqwest::Client, access_token: &str) -> Option<String> {
        let response = self
            .api_get(http, &self.endpoints.emails, access_token)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let emails: Vec<GitHubEmail> = response.json().await.ok()?;
        emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email)
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        url_with_params(
            &self.endpoints.authorize,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", DEFAULT_SCOPE),
                ("state", state),
            ],
        )
    }

    async fn exchange_token(
        &self,
        http: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let response = http
            .post(&self.endpoints.token)
            .header(ACCEPT, "application/json")
            .json(&json!({
                "client_id": self.credentials.client_id,
                "client_secret": self.credentials.client_secret,
                "code": code,
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await?;

        let response = error_for_status(response)
            .await
            .map_err(|message| OAuthError::TokenExchange {
                provider: PROVIDER,
                message,
            })?;
        response.json::<RawTokenResponse>().await?.into_token(PROVIDER)
    }

    async fn fetch_user_info(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<NormalizedUser, OAuthError> {
        let response = self
            .api_get(http, &self.endpoints.user, access_token)
            .send()
            .await?;
        let response = error_for_status(response)
            .await
            .map_err(|message| OAuthError::UserInfo {
                provider: PROVIDER,
                message,
            })?;
        let user: GitHubUser = response.json().await?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => Some(email),
            None => self.primary_email(http, access_token).await,
        };
        let email = email.ok_or(OAuthError::MissingEmail(PROVIDER))?;

        Ok(NormalizedUser {
            id: user.id.to_string(),
            email,
            name: user
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| user.login.clone()),
            avatar_url: user.avatar_url,
            login: Some(user.login),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GitHubProvider {
        GitHubProvider::new(ClientCredentials {
            client_id: "gh-client".into(),
            client_secret: "gh-secret".into(),
        })
    }

    #[test]
    fn authorization_url_carries_client_scope_and_state() {
        let url = provider()
            .authorization_url("st@te", "http://localhost:3000/oauth/github/callback")
            .unwrap();
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=gh-client"));
        assert!(url.contains("scope=read%3Auser+user%3Aemail"));
        assert!(url.contains("state=st%40te"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Foauth%2Fgithub%2Fcallback"));
    }

    #[test]
    fn name_is_registry_key() {
        assert_eq!(provider().name(), "github");
    }
}
