//! Account and workspace provisioning rules.

use validator::ValidateEmail;

use crate::error::CoreError;

/// Minimum accepted password length for email/password accounts.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Label used when a user has no display name to derive one from.
pub const FALLBACK_WORKSPACE_LABEL: &str = "My Workspace";

/// Enforce the password policy. Counts characters, not bytes.
pub fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Reject anything that is not a syntactically valid email address.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if !email.trim().validate_email() {
        return Err(CoreError::Validation("A valid email address is required".into()));
    }
    Ok(())
}

/// Login handle derived from an email address: its local part.
pub fn login_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Label for the workspace auto-provisioned for a user.
pub fn default_workspace_label(display_name: Option<&str>) -> String {
    match display_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name}'s Workspace"),
        None => FALLBACK_WORKSPACE_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        let err = validate_password_strength("elevenchars").unwrap_err();
        assert_eq!(err.message(), "Password must be at least 12 characters");
    }

    #[test]
    fn password_at_minimum_passes() {
        assert!(validate_password_strength("twelve_chars").is_ok());
    }

    #[test]
    fn login_is_local_part() {
        assert_eq!(login_from_email("jane.doe@example.com"), "jane.doe");
        assert_eq!(login_from_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn workspace_label_uses_name_when_present() {
        assert_eq!(default_workspace_label(Some("Ada")), "Ada's Workspace");
        assert_eq!(default_workspace_label(Some("  ")), "My Workspace");
        assert_eq!(default_workspace_label(None), "My Workspace");
    }

    #[test]
    fn email_syntax_is_checked() {
        assert!(validate_email("someone@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }
}
