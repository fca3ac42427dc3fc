use std::collections::HashMap;

use axum::extract::ws::Message;
use nvoi_core::types::DbId;
use tokio::sync::{mpsc, RwLock};

use crate::relay::runner::JobRunnerHandle;

/// Registry of per-user relay actors, keyed by user id.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. At most one actor exists per user; it is
/// started by the first socket and reaped by the heartbeat once it has none.
pub struct RelayHub {
    runners: RwLock<HashMap<DbId, JobRunnerHandle>>,
}

impl RelayHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            runners: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a socket to the user's actor, starting the actor if needed.
    ///
    /// Returns the receiver half of the socket's outbound channel so the
    /// caller can forward frames to the WebSocket sink.
    pub async fn attach(&self, user_id: DbId, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let mut runners = self.runners.write().await;

        if let Some(runner) = runners.get(&user_id) {
            if let Some(rx) = runner.attach(conn_id.clone()) {
                return rx;
            }
        }

        // No actor yet, or it stopped: start a fresh one.
        let runner = JobRunnerHandle::spawn(user_id);
        let rx = match runner.attach(conn_id) {
            Some(rx) => rx,
            // A just-spawned actor only stops on an explicit close.
            None => mpsc::unbounded_channel().1,
        };
        runners.insert(user_id, runner);
        rx
    }

    /// Detach a socket. Unknown users and connection ids are a no-op.
    pub async fn detach(&self, user_id: DbId, conn_id: &str) {
        if let Some(runner) = self.runners.read().await.get(&user_id) {
            runner.detach(conn_id.to_string());
        }
    }

    /// Push a job notification to the user's sockets.
    ///
    /// Returns `false` when the user has no actor (nobody is listening).
    pub async fn notify(&self, user_id: DbId, key: &str, data: &serde_json::Value, timestamp_ms: i64) -> bool {
        match self.runners.read().await.get(&user_id) {
            Some(runner) => runner.notify(key, data, timestamp_ms),
            None => false,
        }
    }

    /// Send a Ping frame to every attached socket.
    pub async fn ping_all(&self) {
        for runner in self.runners.read().await.values() {
            runner.ping();
        }
    }

    /// Stop and forget actors that have no sockets left.
    ///
    /// Returns the number of actors reaped.
    pub async fn reap_idle(&self) -> usize {
        let mut runners = self.runners.write().await;

        let mut idle = Vec::new();
        for (user_id, runner) in runners.iter() {
            if !runner.is_running() || runner.connection_count().await == 0 {
                idle.push(*user_id);
            }
        }

        for user_id in &idle {
            if let Some(runner) = runners.remove(user_id) {
                runner.close();
            }
        }
        if !idle.is_empty() {
            tracing::debug!(reaped = idle.len(), "Reaped idle job runners");
        }
        idle.len()
    }

    /// Total sockets attached across all actors.
    pub async fn connection_count(&self) -> usize {
        let runners = self.runners.read().await;
        let mut total = 0;
        for runner in runners.values() {
            total += runner.connection_count().await;
        }
        total
    }

    /// Number of live actors.
    pub async fn runner_count(&self) -> usize {
        self.runners.read().await.len()
    }

    /// Send a Close frame to every socket, then stop all actors.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let drained: Vec<JobRunnerHandle> = self.runners.write().await.drain().map(|(_, r)| r).collect();
        let count = drained.len();
        for runner in &drained {
            runner.close();
        }
        for runner in drained {
            runner.join().await;
        }
        tracing::info!(count, "Closed all job runners");
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
