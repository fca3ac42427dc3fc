use std::sync::Arc;

use nvoi_events::{EventBus, InviteMailer};
use nvoi_worker::JobQueue;

use crate::config::ServerConfig;
use crate::relay::RelayHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: nvoi_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-user job relay actors (browser job sockets).
    pub relay_hub: Arc<RelayHub>,
    /// Job update bus; the worker and the jobs endpoint publish here.
    pub event_bus: Arc<EventBus>,
    /// Producer side of the in-process job queue.
    pub job_queue: JobQueue,
    /// Invite mailer; `None` when SMTP is not configured.
    pub mailer: Option<Arc<InviteMailer>>,
    /// Outbound HTTP client for OAuth providers.
    pub http: reqwest::Client,
}
