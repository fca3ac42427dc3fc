//! Job change notifications inside one process.
//!
//! Whoever changes a job row publishes a [`JobUpdate`] on the [`EventBus`];
//! the API's notification relay is the subscriber that pushes it to
//! browsers.

use chrono::{DateTime, Utc};
use nvoi_core::types::DbId;
use nvoi_db::models::job::Job;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobUpdate
// ---------------------------------------------------------------------------

/// A job row changed and its owner should hear about it.
///
/// `job` is the complete row as re-read after the change, never a partial
/// patch, so clients can replace their copy by `key`.
#[derive(Debug, Clone, Serialize)]
pub struct JobUpdate {
    /// Owner of the job; selects the relay actor.
    pub user_id: DbId,
    /// The job's composed `"<userId>:<clientKey>"` key.
    pub key: String,
    /// Full job row.
    pub job: Job,
    /// When the update was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobUpdate {
    /// Build an update for `job`, addressed to its owner.
    pub fn from_job(job: Job) -> Self {
        Self {
            user_id: job.user_id,
            key: job.key.clone(),
            job,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Updates buffered per subscriber before the slowest one starts lagging.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of [`JobUpdate`]s to every subscriber.
///
/// Share it as `Arc<EventBus>`. Dropping the last handle closes the channel,
/// which is how the notification relay learns to stop.
pub struct EventBus {
    sender: broadcast::Sender<JobUpdate>,
}

impl EventBus {
    /// A bus buffering up to `capacity` updates. Past that, the oldest are
    /// overwritten and slow subscribers see `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Returns how many subscribers will see `update`; `0` means it was
    /// dropped because nobody is listening.
    pub fn publish(&self, update: JobUpdate) -> usize {
        match self.sender.send(update) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(update)) => {
                tracing::trace!(job_id = %update.job.id, "Job update published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
