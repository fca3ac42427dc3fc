//! Workspace invite delivery via SMTP.
//!
//! [`InviteMailer`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and invites are created without
//! an email being sent.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use nvoi_core::invites::INVITE_EXPIRY_DAYS;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("could not assemble invite email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|source| EmailError::Address {
        address: address.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// SMTP settings
// ---------------------------------------------------------------------------

const SMTP_SUBMISSION_PORT: u16 = 587;

const FALLBACK_SENDER: &str = "nvoi <invites@nvoi.app>";

/// SMTP relay settings read from `SMTP_*` variables.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// STARTTLS submission port unless `SMTP_PORT` says otherwise.
    pub smtp_port: u16,
    /// `From` header, e.g. `nvoi <invites@nvoi.app>`.
    pub sender: String,
    /// Username and password, only when both are set.
    pub credentials: Option<(String, String)>,
}

impl EmailConfig {
    /// `None` when `SMTP_HOST` is unset: invites are then created without
    /// an email. A malformed `SMTP_PORT` falls back to 587.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let smtp_host = var("SMTP_HOST")?;
        let smtp_port = var("SMTP_PORT")
            .and_then(|port| port.parse().ok())
            .unwrap_or(SMTP_SUBMISSION_PORT);
        let credentials = var("SMTP_USER").zip(var("SMTP_PASSWORD"));

        Some(Self {
            smtp_host,
            smtp_port,
            sender: var("SMTP_FROM").unwrap_or_else(|| FALLBACK_SENDER.to_string()),
            credentials,
        })
    }
}

// ---------------------------------------------------------------------------
// InviteEmail
// ---------------------------------------------------------------------------

/// Content of one invitation email.
#[derive(Debug, Clone)]
pub struct InviteEmail {
    pub to: String,
    pub inviter_name: String,
    pub workspace_label: String,
    pub token: String,
    /// Public origin of the app, without a trailing slash.
    pub base_url: String,
}

impl InviteEmail {
    /// Link the invitee follows to view the invite.
    pub fn invite_url(&self) -> String {
        format!("{}/invite/{}", self.base_url.trim_end_matches('/'), self.token)
    }

    pub fn subject(&self) -> String {
        format!("{} invited you to {}", self.inviter_name, self.workspace_label)
    }

    pub fn text_body(&self) -> String {
        format!(
            "You've been invited to join {label}\n\n\
             {inviter} has invited you to collaborate in their workspace.\n\n\
             Accept invitation: {url}\n\n\
             This invitation expires in {INVITE_EXPIRY_DAYS} days.\n",
            label = self.workspace_label,
            inviter = self.inviter_name,
            url = self.invite_url(),
        )
    }

    pub fn html_body(&self) -> String {
        format!(
            "<h2>You've been invited to join {label}</h2>\
             <p>{inviter} has invited you to collaborate in their workspace.</p>\
             <p><a href=\"{url}\">Accept Invitation</a></p>\
             <p>This invitation expires in {INVITE_EXPIRY_DAYS} days.</p>\
             <p>If you don't have an account yet, you'll be able to create one when you accept.</p>",
            label = escape_html(&self.workspace_label),
            inviter = escape_html(&self.inviter_name),
            url = escape_html(&self.invite_url()),
        )
    }
}

/// Escape the characters that matter inside HTML text and attribute values.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// InviteMailer
// ---------------------------------------------------------------------------

/// Sends invitation emails through one STARTTLS relay.
pub struct InviteMailer {
    sender: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl InviteMailer {
    /// Build the SMTP transport. No connection is made until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let Some((user, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(user, password));
        }
        Ok(Self {
            sender: config.sender,
            transport: builder.build(),
        })
    }

    pub async fn send(&self, invite: &InviteEmail) -> Result<(), EmailError> {
        let message = compose(&self.sender, invite)?;
        self.transport.send(message).await?;
        tracing::info!(to = %invite.to, workspace = %invite.workspace_label, "Invite email sent");
        Ok(())
    }
}

/// The invite as a text + HTML alternative message.
fn compose(sender: &str, invite: &InviteEmail) -> Result<Message, EmailError> {
    let message = Message::builder()
        .from(mailbox(sender)?)
        .to(mailbox(&invite.to)?)
        .subject(invite.subject())
        .multipart(MultiPart::alternative_plain_html(
            invite.text_body(),
            invite.html_body(),
        ))?;
    Ok(message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InviteEmail {
        InviteEmail {
            to: "friend@example.com".to_string(),
            inviter_name: "Ada".to_string(),
            workspace_label: "Ada's Workspace".to_string(),
            token: "tok-123".to_string(),
            base_url: "https://nvoi.app/".to_string(),
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn invite_url_joins_base_and_token() {
        assert_eq!(sample().invite_url(), "https://nvoi.app/invite/tok-123");
    }

    #[test]
    fn subject_names_inviter_and_workspace() {
        assert_eq!(sample().subject(), "Ada invited you to Ada's Workspace");
    }

    #[test]
    fn bodies_mention_link_and_expiry() {
        let email = sample();
        assert!(email.text_body().contains("https://nvoi.app/invite/tok-123"));
        assert!(email.text_body().contains("expires in 7 days"));
        assert!(email.html_body().contains("Ada&#39;s Workspace"));
    }

    #[test]
    fn compose_addresses_the_invitee() {
        let message = compose("nvoi <invites@nvoi.app>", &sample()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: friend@example.com"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn compose_rejects_a_bad_recipient() {
        let mut invite = sample();
        invite.to = "not an address".to_string();
        let err = compose("invites@nvoi.app", &invite).unwrap_err();
        assert!(matches!(err, EmailError::Address { ref address, .. } if address == "not an address"));
    }
}
