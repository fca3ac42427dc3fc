//! Provider lookup by name.

use crate::oauth::auth0::Auth0Provider;
use crate::oauth::github::GitHubProvider;
use crate::oauth::google::GoogleProvider;
use crate::oauth::{OAuthConfig, OAuthError, OAuthProvider};

/// Providers offered on the public login page, in display order.
/// Anthropic is a secondary connection, not a login method.
pub const LOGIN_PROVIDERS: [&str; 3] = ["github", "google", "auth0"];

/// Name of the PKCE-only provider handled by the settings page.
pub const ANTHROPIC: &str = "anthropic";

/// Build the login provider called `name`.
pub fn provider_for(name: &str, config: &OAuthConfig) -> Result<Box<dyn OAuthProvider>, OAuthError> {
    let not_configured = || OAuthError::NotConfigured(name.to_string());
    match name {
        "github" => {
            let creds = config.github.clone().ok_or_else(not_configured)?;
            Ok(Box::new(GitHubProvider::new(creds)))
        }
        "google" => {
            let creds = config.google.clone().ok_or_else(not_configured)?;
            Ok(Box::new(GoogleProvider::new(creds)))
        }
        "auth0" => {
            let auth0 = config.auth0.clone().ok_or_else(not_configured)?;
            Ok(Box::new(Auth0Provider::new(auth0)))
        }
        other => Err(OAuthError::UnknownProvider(other.to_string())),
    }
}

/// Whether `name` can be used right now. Anthropic needs no secret and is
/// always available.
pub fn is_provider_configured(name: &str, config: &OAuthConfig) -> bool {
    match name {
        "github" => config.github.is_some(),
        "google" => config.google.is_some(),
        "auth0" => config.auth0.is_some(),
        ANTHROPIC => true,
        _ => false,
    }
}

/// Login providers with complete configuration.
pub fn configured_providers(config: &OAuthConfig) -> Vec<&'static str> {
    LOGIN_PROVIDERS
        .into_iter()
        .filter(|name| is_provider_configured(name, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::oauth::{anthropic, ClientCredentials};

    fn config_with_github() -> OAuthConfig {
        OAuthConfig {
            github: Some(ClientCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            }),
            google: None,
            auth0: None,
            redirect_base: "http://localhost:3000".into(),
            anthropic_token_url: anthropic::TOKEN_URL.into(),
        }
    }

    #[test]
    fn only_configured_login_providers_are_listed() {
        assert_eq!(configured_providers(&config_with_github()), vec!["github"]);
    }

    #[test]
    fn anthropic_is_always_configured_but_never_listed() {
        let config = config_with_github();
        assert!(is_provider_configured("anthropic", &config));
        assert!(!configured_providers(&config).contains(&"anthropic"));
    }

    #[test]
    fn lookup_distinguishes_unknown_from_unconfigured() {
        let config = config_with_github();
        assert_eq!(provider_for("github", &config).unwrap().name(), "github");
        assert_matches!(provider_for("google", &config).err(), Some(OAuthError::NotConfigured(n)) if n == "google");
        assert_matches!(provider_for("myspace", &config).err(), Some(OAuthError::UnknownProvider(_)));
    }
}
