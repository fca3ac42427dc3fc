//! Google login: form-encoded token exchange and the v3 userinfo endpoint.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::oauth::provider::{error_for_status, url_with_params, RawTokenResponse};
use crate::oauth::{ClientCredentials, NormalizedUser, OAuthError, OAuthProvider, TokenResponse};

const DEFAULT_SCOPE: &str = "openid email profile";
const PROVIDER: &str = "Google";

/// Google endpoint URLs; overridable for tests.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token: "https://www.googleapis.com/oauth2/v4/token".into(),
            userinfo: "https://www.googleapis.com/oauth2/v3/userinfo".into(),
        }
    }
}

pub struct GoogleProvider {
    credentials: ClientCredentials,
    endpoints: GoogleEndpoints,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    sub: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl GoogleProvider {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self::with_endpoints(credentials, GoogleEndpoints::default())
    }

    pub fn with_endpoints(credentials: ClientCredentials, endpoints: GoogleEndpoints) -> Self {
        Self {
            credentials,
            endpoints,
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        url_with_params(
            &self.endpoints.authorize,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", DEFAULT_SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "select_account"),
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
            .form(&[
                ("code", code),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
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
        let response = http
            .get(&self.endpoints.userinfo)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        let response = error_for_status(response)
            .await
            .map_err(|message| OAuthError::UserInfo {
                provider: PROVIDER,
                message,
            })?;
        let user: GoogleUser = response.json().await?;

        Ok(NormalizedUser {
            id: user.sub,
            name: user
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| user.email.clone()),
            email: user.email,
            avatar_url: user.picture,
            login: None,
        })
    }
}
