//! Auth0 login against a tenant domain.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::oauth::provider::{error_for_status, url_with_params, RawTokenResponse};
use crate::oauth::{Auth0Config, NormalizedUser, OAuthError, OAuthProvider, TokenResponse};

const DEFAULT_SCOPE: &str = "openid email profile";
const PROVIDER: &str = "Auth0";

pub struct Auth0Provider {
    config: Auth0Config,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Auth0User {
    sub: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Tenant origin: the domain as given if it has a scheme, else `https://`.
pub fn tenant_base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

impl Auth0Provider {
    pub fn new(config: Auth0Config) -> Self {
        let base_url = tenant_base_url(&config.domain);
        Self { config, base_url }
    }
}

#[async_trait]
impl OAuthProvider for Auth0Provider {
    fn name(&self) -> &'static str {
        "auth0"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        url_with_params(
            &format!("{}/authorize", self.base_url),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
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
            .post(format!("{}/oauth/token", self.base_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
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
            .get(format!("{}/userinfo", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        let response = error_for_status(response)
            .await
            .map_err(|message| OAuthError::UserInfo {
                provider: PROVIDER,
                message,
            })?;
        let user: Auth0User = response.json().await?;

        let name = [user.name, user.nickname]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| user.email.clone());

        Ok(NormalizedUser {
            id: user.sub,
            email: user.email,
            name,
            avatar_url: user.picture,
            login: None,
        })
    }
}
