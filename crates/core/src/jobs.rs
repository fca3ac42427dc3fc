//! Job keys and per-type constants.

use std::time::Duration;

use crate::error::CoreError;
pub use crate::status::{JobStatus, JobType};
use crate::types::DbId;

/// Maximum length of the client-supplied part of a job key.
pub const MAX_CLIENT_KEY_LEN: usize = 200;

/// Number of jobs the dashboard loads on first render.
pub const RECENT_JOBS_LIMIT: i64 = 50;

impl JobType {
    /// How long the simulated work step of this job type takes at full scale.
    pub fn simulated_duration(self) -> Duration {
        match self {
            JobType::Export => Duration::from_secs(3),
            JobType::Email => Duration::from_secs(2),
            JobType::Report => Duration::from_secs(4),
        }
    }
}

impl JobStatus {
    /// `completed` and `error` are final; nothing moves a job out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Compose the stored job key `"<userId>:<clientKey>"`.
///
/// Prefixing with the owner keeps keys from different users disjoint even
/// when clients pick the same key.
pub fn job_key(user_id: DbId, client_key: &str) -> String {
    format!("{user_id}:{client_key}")
}

/// Validate the client-supplied key from `POST /app/api/jobs`.
pub fn validate_client_key(key: &str) -> Result<(), CoreError> {
    if key.trim().is_empty() {
        return Err(CoreError::Validation("Job key is required".into()));
    }
    if key.len() > MAX_CLIENT_KEY_LEN {
        return Err(CoreError::Validation(format!(
            "Job key must be at most {MAX_CLIENT_KEY_LEN} characters"
        )));
    }
    Ok(())
}

/// Parse the `type` field of a job request into a known [`JobType`].
pub fn parse_job_type(raw: &str) -> Result<JobType, CoreError> {
    raw.parse::<JobType>()
        .map_err(|e| CoreError::Validation(format!("Unsupported job type: {}", e.value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_with_owner() {
        let user_id = uuid::Uuid::nil();
        let key = job_key(user_id, "export-1");
        assert_eq!(key, "00000000-0000-0000-0000-000000000000:export-1");
    }

    #[test]
    fn client_key_may_contain_colons() {
        let user_id = uuid::Uuid::nil();
        let key = job_key(user_id, "a:b");
        assert_eq!(key, format!("{user_id}:a:b"));
    }

    #[test]
    fn durations_per_type() {
        assert_eq!(JobType::Export.simulated_duration(), Duration::from_secs(3));
        assert_eq!(JobType::Email.simulated_duration(), Duration::from_secs(2));
        assert_eq!(JobType::Report.simulated_duration(), Duration::from_secs(4));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn blank_and_oversized_keys_are_rejected() {
        assert!(validate_client_key("  ").is_err());
        assert!(validate_client_key(&"k".repeat(MAX_CLIENT_KEY_LEN + 1)).is_err());
        assert!(validate_client_key("report-2024").is_ok());
    }

    #[test]
    fn unknown_job_type_is_a_validation_error() {
        let err = parse_job_type("transcode").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref m) if m.contains("transcode")));
        assert_eq!(parse_job_type("report").unwrap(), JobType::Report);
    }
}
