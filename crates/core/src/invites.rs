//! Workspace invite rules.

use chrono::Duration;

use crate::error::CoreError;
pub use crate::status::{InviteRole, InviteStatus};
use crate::types::Timestamp;

/// Invites expire this many days after they are issued.
pub const INVITE_EXPIRY_DAYS: i64 = 7;

/// Expiry timestamp for an invite issued at `now`.
pub fn invite_expiry(now: Timestamp) -> Timestamp {
    now + Duration::days(INVITE_EXPIRY_DAYS)
}

/// Why an invite cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptRejection {
    /// The invite was already accepted, declined or expired.
    NotPending,
    /// The invite is still pending but past its expiry; the caller should
    /// persist the `expired` status.
    Expired,
    /// The accepting account's email differs from the invited address.
    EmailMismatch,
}

impl From<AcceptRejection> for CoreError {
    fn from(value: AcceptRejection) -> Self {
        let msg = match value {
            AcceptRejection::NotPending => "Invite is no longer pending",
            AcceptRejection::Expired => "Invite has expired",
            AcceptRejection::EmailMismatch => "This invite was sent to a different email address",
        };
        CoreError::Validation(msg.into())
    }
}

/// Decide whether an invite in `status` can be accepted by `acceptor_email`.
///
/// Checks run in order: status, expiry, email. Email comparison is
/// case-insensitive.
pub fn check_acceptable(
    status: InviteStatus,
    expires_at: Timestamp,
    invite_email: &str,
    acceptor_email: &str,
    now: Timestamp,
) -> Result<(), AcceptRejection> {
    if status != InviteStatus::Pending {
        return Err(AcceptRejection::NotPending);
    }
    if expires_at < now {
        return Err(AcceptRejection::Expired);
    }
    if !invite_email.trim().eq_ignore_ascii_case(acceptor_email.trim()) {
        return Err(AcceptRejection::EmailMismatch);
    }
    Ok(())
}

/// Only pending invites can be declined.
pub fn check_declinable(status: InviteStatus) -> Result<(), CoreError> {
    if status != InviteStatus::Pending {
        return Err(AcceptRejection::NotPending.into());
    }
    Ok(())
}

/// Normalize an invite address for storage and duplicate detection.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn expiry_is_seven_days_out() {
        let now = Utc::now();
        assert_eq!(invite_expiry(now) - now, Duration::days(7));
    }

    #[test]
    fn pending_unexpired_matching_email_is_acceptable() {
        let now = Utc::now();
        let result = check_acceptable(
            InviteStatus::Pending,
            invite_expiry(now),
            "Friend@Example.com",
            "friend@example.com",
            now,
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn non_pending_is_rejected_before_expiry() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        for status in [InviteStatus::Accepted, InviteStatus::Declined, InviteStatus::Expired] {
            assert_eq!(
                check_acceptable(status, past, "a@b.c", "a@b.c", now),
                Err(AcceptRejection::NotPending)
            );
        }
    }

    #[test]
    fn expired_pending_invite_is_rejected() {
        let now = Utc::now();
        let result = check_acceptable(
            InviteStatus::Pending,
            now - Duration::seconds(1),
            "a@b.c",
            "a@b.c",
            now,
        );
        assert_eq!(result, Err(AcceptRejection::Expired));
    }

    #[test]
    fn different_email_is_rejected() {
        let now = Utc::now();
        let result = check_acceptable(
            InviteStatus::Pending,
            invite_expiry(now),
            "invited@example.com",
            "someone-else@example.com",
            now,
        );
        assert_eq!(result, Err(AcceptRejection::EmailMismatch));
        let err: CoreError = AcceptRejection::EmailMismatch.into();
        assert!(err.message().contains("different email address"));
    }

    #[test]
    fn only_pending_can_be_declined() {
        assert!(check_declinable(InviteStatus::Pending).is_ok());
        assert!(check_declinable(InviteStatus::Accepted).is_err());
    }
}
