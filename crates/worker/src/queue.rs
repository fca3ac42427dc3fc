//! In-process job queue with ack/retry consumption.
//!
//! The queue is an unbounded channel living inside the API process. It is
//! not durable: messages still queued when the process exits are lost, and
//! their rows stay `queued`.

use std::future::Future;
use std::sync::Arc;

use nvoi_core::jobs::JobType;
use nvoi_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Body of one queued job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub job_id: DbId,
    /// Composed `"<userId>:<clientKey>"` key of the job row.
    pub key: String,
    /// Client payload as submitted.
    pub payload: serde_json::Value,
}

/// A message plus how many times it has been handed to a handler.
#[derive(Debug)]
struct Delivery {
    message: JobMessage,
    attempt: u32,
}

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Delivery>,
}

/// Consumer half returned by [`JobQueue::new`]; pass it to [`QueueConsumer`].
pub struct QueueReceiver {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl JobQueue {
    /// Create a queue and its receiving half.
    pub fn new() -> (Self, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, QueueReceiver { receiver })
    }

    /// Enqueue a message for its first delivery.
    pub fn send(&self, message: JobMessage) -> Result<(), WorkerError> {
        self.sender
            .send(Delivery {
                message,
                attempt: 1,
            })
            .map_err(|_| WorkerError::QueueClosed)
    }
}

// ---------------------------------------------------------------------------
// JobHandler
// ---------------------------------------------------------------------------

/// Processes one message. `Ok` acknowledges it; `Err` asks for redelivery.
pub trait JobHandler: Send + Sync + 'static {
    fn handle(
        &self,
        message: &JobMessage,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Called once when a message is dropped after its final failed
    /// delivery, with the last error.
    fn abandon(
        &self,
        _message: &JobMessage,
        _error: &WorkerError,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }
}

// ---------------------------------------------------------------------------
// QueueConsumer
// ---------------------------------------------------------------------------

/// Pulls messages off the queue and runs them concurrently.
///
/// At most `config.concurrency` handlers run at once. A failed delivery is
/// put back on the queue immediately, without backoff, until it has been
/// retried `config.max_retries` times; then it is logged, handed to
/// [`JobHandler::abandon`] and dropped.
pub struct QueueConsumer<H> {
    receiver: QueueReceiver,
    requeue: JobQueue,
    handler: Arc<H>,
    config: WorkerConfig,
}

impl<H: JobHandler> QueueConsumer<H> {
    /// `queue` must be the producer paired with `receiver`; failed
    /// deliveries are sent back through it.
    pub fn new(queue: JobQueue, receiver: QueueReceiver, handler: H, config: WorkerConfig) -> Self {
        Self {
            receiver,
            requeue: queue,
            handler: Arc::new(handler),
            config,
        }
    }

    /// Run until `cancel` fires, then wait for in-flight handlers to finish.
    pub async fn run(mut self, cancel: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            concurrency = self.config.concurrency,
            max_retries = self.config.max_retries,
            "Job queue consumer started",
        );

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                _ = cancel.cancelled() => break,
                delivery = self.receiver.receiver.recv() => match delivery {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            // Reap finished handlers so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}

            let handler = Arc::clone(&self.handler);
            let requeue = self.requeue.clone();
            let max_attempts = self.config.max_retries.saturating_add(1);

            in_flight.spawn(async move {
                let _permit = permit;
                let Delivery { message, attempt } = delivery;
                let job_id = message.job_id;

                match handler.handle(&message).await {
                    Ok(()) => {
                        tracing::debug!(%job_id, attempt, "Job message acknowledged");
                    }
                    Err(e) if attempt < max_attempts => {
                        tracing::warn!(%job_id, attempt, error = %e, "Job failed, retrying");
                        let retry = Delivery {
                            message,
                            attempt: attempt + 1,
                        };
                        if requeue.sender.send(retry).is_err() {
                            tracing::error!(%job_id, "Queue closed, dropping retry");
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            %job_id,
                            attempt,
                            error = %e,
                            "Job failed on final attempt, dropping message",
                        );
                        handler.abandon(&message, &e).await;
                    }
                }
            });
        }

        tracing::info!(in_flight = in_flight.len(), "Job queue consumer shutting down");
        while in_flight.join_next().await.is_some() {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
