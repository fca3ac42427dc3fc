//! Anthropic account connection via PKCE.
//!
//! There is no client secret and no automatic callback: the user authorizes
//! on claude.ai, is shown a `code#state` string, and pastes it back into the
//! settings form. The verifier generated here must be kept in the session
//! until that code comes back.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::oauth::provider::{error_for_status, url_with_params, RawTokenResponse};
use crate::oauth::{OAuthError, TokenResponse};

pub const CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";
pub const AUTHORIZATION_URL: &str = "https://claude.ai/oauth/authorize";
pub const TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";
pub const REDIRECT_URI: &str = "https://console.anthropic.com/oauth/code/callback";
pub const SCOPES: &str = "org:create_api_key user:profile user:inference";

const PROVIDER: &str = "Anthropic";

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

/// Authorization URL plus the verifier to stash in the session.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub url: String,
    pub verifier: String,
}

/// Fresh verifier (two UUIDs, 72 chars) and its challenge.
pub fn generate_pkce() -> Pkce {
    let verifier = format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    let challenge = challenge_for(&verifier);
    Pkce {
        verifier,
        challenge,
    }
}

/// `BASE64URL-NOPAD(SHA256(verifier))`.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Build the claude.ai authorization URL for `state`.
pub fn build_auth_url(state: &str) -> Result<AuthRequest, OAuthError> {
    let pkce = generate_pkce();
    let url = url_with_params(
        AUTHORIZATION_URL,
        &[
            ("code", "true"),
            ("client_id", CLIENT_ID),
            ("response_type", "code"),
            ("redirect_uri", REDIRECT_URI),
            ("scope", SCOPES),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("state", state),
        ],
    )?;
    Ok(AuthRequest {
        url,
        verifier: pkce.verifier,
    })
}

/// Split a pasted `code#state` into its parts.
pub fn split_code(pasted: &str) -> (&str, Option<&str>) {
    match pasted.trim().split_once('#') {
        Some((code, state)) => (code, Some(state)),
        None => (pasted.trim(), None),
    }
}

/// Scopes recorded on the user after a successful exchange.
pub fn granted_scopes() -> Vec<String> {
    SCOPES.split(' ').map(str::to_string).collect()
}

/// Exchange a pasted code for tokens at `token_url`.
pub async fn exchange_token(
    http: &reqwest::Client,
    token_url: &str,
    pasted_code: &str,
    verifier: &str,
) -> Result<TokenResponse, OAuthError> {
    let (code, state) = split_code(pasted_code);

    let response = http
        .post(token_url)
        .json(&json!({
            "code": code,
            "state": state,
            "grant_type": "authorization_code",
            "client_id": CLIENT_ID,
            "redirect_uri": REDIRECT_URI,
            "code_verifier": verifier,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc7636_example() {
        // Appendix B of RFC 7636.
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn verifier_is_two_uuids_and_challenge_is_unpadded() {
        let pkce = generate_pkce();
        assert_eq!(pkce.verifier.len(), 72);
        assert_eq!(pkce.challenge.len(), 43);
        assert!(!pkce.challenge.contains('='));
        assert!(!pkce.challenge.contains('+'));
        assert!(!pkce.challenge.contains('/'));
    }

    #[test]
    fn auth_url_carries_pkce_parameters() {
        let request = build_auth_url("state-1").unwrap();
        let url = reqwest::Url::parse(&request.url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("claude.ai"));
        assert_eq!(params["code"], "true");
        assert_eq!(params["client_id"], CLIENT_ID);
        assert_eq!(params["redirect_uri"], REDIRECT_URI);
        assert_eq!(params["scope"], SCOPES);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], challenge_for(&request.verifier));
        assert_eq!(params["state"], "state-1");
    }

    #[test]
    fn pasted_code_is_split_on_hash() {
        assert_eq!(split_code("abc#xyz"), ("abc", Some("xyz")));
        assert_eq!(split_code(" abc \n"), ("abc", None));
    }

    #[test]
    fn scopes_are_listed_individually() {
        assert_eq!(
            granted_scopes(),
            ["org:create_api_key", "user:profile", "user:inference"]
        );
    }
}
