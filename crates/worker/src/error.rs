use nvoi_core::types::DbId;

/// Errors raised while queueing or processing a job.
///
/// Any error returned from [`JobHandler::handle`](crate::JobHandler::handle)
/// makes the consumer redeliver the message.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The job row could not be read or written.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The consumer side of the queue is gone.
    #[error("Job queue is closed")]
    QueueClosed,

    /// The job's work step failed. Recorded on the row, not retried.
    #[error("{0}")]
    Work(String),

    /// A message referenced a job row that does not exist.
    #[error("Job {0} not found")]
    JobNotFound(DbId),
}
