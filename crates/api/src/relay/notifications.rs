//! Bridge from the event bus to the relay hub.

use std::sync::Arc;

use nvoi_events::JobUpdate;
use tokio::sync::broadcast;

use crate::relay::hub::RelayHub;

/// Forwards every [`JobUpdate`] on the bus to its owner's relay actor.
///
/// A single instance consumes the bus, so updates reach each actor in
/// publish order.
pub struct NotificationRelay {
    hub: Arc<RelayHub>,
}

impl NotificationRelay {
    pub fn new(hub: Arc<RelayHub>) -> Self {
        Self { hub }
    }

    /// Run until the bus closes (i.e. the [`EventBus`](nvoi_events::EventBus)
    /// is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<JobUpdate>) {
        loop {
            match receiver.recv().await {
                Ok(update) => self.relay(&update).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification relay lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification relay shutting down");
                    break;
                }
            }
        }
    }

    async fn relay(&self, update: &JobUpdate) {
        let data = match serde_json::to_value(&update.job) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(job_id = %update.job.id, error = %e, "Failed to serialize job");
                return;
            }
        };

        let delivered = self
            .hub
            .notify(update.user_id, &update.key, &data, update.timestamp.timestamp_millis())
            .await;
        tracing::debug!(
            user_id = %update.user_id,
            job_id = %update.job.id,
            status = %update.job.status,
            delivered,
            "Relayed job update",
        );
    }
}
