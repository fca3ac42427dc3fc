use async_trait::async_trait;
use serde::Deserialize;

use crate::oauth::OAuthError;

/// Token endpoint response shared by every provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, when the provider reports one.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Raw token endpoint body: providers report failures in-band with 200.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RawTokenResponse {
    /// Accept the body only if it carries an access token and no error.
    pub(crate) fn into_token(self, provider: &'static str) -> Result<TokenResponse, OAuthError> {
        match (self.error, self.access_token) {
            (None, Some(access_token)) => Ok(TokenResponse {
                access_token,
                token_type: self.token_type,
                expires_in: self.expires_in,
                refresh_token: self.refresh_token,
                scope: self.scope,
            }),
            (error, _) => Err(OAuthError::TokenExchange {
                provider,
                message: error.unwrap_or_else(|| "No access token".to_string()),
            }),
        }
    }
}

/// A provider's profile mapped onto the fields the account needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUser {
    /// Provider-side user id.
    pub id: String,
    pub email: String,
    /// Display name, falling back to the best identifier the provider has.
    pub name: String,
    pub avatar_url: Option<String>,
    /// Username, for providers that have one (GitHub).
    pub login: Option<String>,
}

/// An authorization-code login provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Registry name, also the `{provider}` path segment.
    fn name(&self) -> &'static str;

    /// URL the browser is sent to.
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError>;

    /// Trade the callback `code` for an access token.
    async fn exchange_token(
        &self,
        http: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OAuthError>;

    /// Fetch and normalize the profile behind `access_token`.
    async fn fetch_user_info(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<NormalizedUser, OAuthError>;
}

/// `base?k=v&...` with proper query encoding.
pub(crate) fn url_with_params(base: &str, params: &[(&str, &str)]) -> Result<String, OAuthError> {
    reqwest::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| OAuthError::InvalidUrl(format!("{base}: {e}")))
}

/// Turn a non-2xx response into an error carrying status and body.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("{status} - {body}"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn token_body_with_error_is_rejected() {
        let raw: RawTokenResponse =
            serde_json::from_str(r#"{"error":"bad_verification_code"}"#).unwrap();
        assert_matches!(
            raw.into_token("GitHub"),
            Err(OAuthError::TokenExchange { message, .. }) if message == "bad_verification_code"
        );
    }

    #[test]
    fn token_body_without_token_is_rejected() {
        let raw: RawTokenResponse = serde_json::from_str("{}").unwrap();
        assert_matches!(
            raw.into_token("Google"),
            Err(OAuthError::TokenExchange { message, .. }) if message == "No access token"
        );
    }

    #[test]
    fn token_body_with_token_is_accepted() {
        let raw: RawTokenResponse =
            serde_json::from_str(r#"{"access_token":"gho_x","token_type":"bearer","expires_in":3600}"#)
                .unwrap();
        let token = raw.into_token("GitHub").unwrap();
        assert_eq!(token.access_token, "gho_x");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[test]
    fn url_params_are_encoded() {
        let url = url_with_params("https://example.com/authorize", &[("scope", "read:user user:email")])
            .unwrap();
        assert_eq!(url, "https://example.com/authorize?scope=read%3Auser+user%3Aemail");
    }
}
