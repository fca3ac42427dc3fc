//! Per-user relay actor.
//!
//! Each user with at least one open job socket gets one [`JobRunner`] task.
//! The task owns that user's socket set outright; every operation on it
//! arrives as a [`RunnerCommand`] over a channel and is applied in arrival
//! order, so fan-out never races with sockets attaching or leaving.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use nvoi_core::types::DbId;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Channel sender half for pushing frames to one WebSocket connection.
pub type ConnSender = mpsc::UnboundedSender<Message>;

/// Wire format of a job notification.
#[derive(Debug, Serialize)]
pub struct RelayMessage<'a> {
    /// Composed job key (`"<userId>:<clientKey>"`).
    pub key: &'a str,
    /// Full job row.
    pub data: &'a serde_json::Value,
    /// Publish time in epoch milliseconds.
    pub timestamp: i64,
}

enum RunnerCommand {
    Attach { conn_id: String, sender: ConnSender },
    Detach { conn_id: String },
    Notify { frame: String },
    Ping,
    Count { reply: oneshot::Sender<usize> },
    Close,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner-side handle to a running [`JobRunner`].
pub struct JobRunnerHandle {
    user_id: DbId,
    commands: mpsc::UnboundedSender<RunnerCommand>,
    task: JoinHandle<()>,
}

impl JobRunnerHandle {
    /// Spawn the actor for `user_id`.
    pub fn spawn(user_id: DbId) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let runner = JobRunner {
            user_id,
            sockets: HashMap::new(),
        };
        let task = tokio::spawn(runner.run(receiver));
        tracing::debug!(%user_id, "Job runner started");
        Self {
            user_id,
            commands,
            task,
        }
    }

    /// Whether the actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Register a socket; returns the receiver its sender task drains.
    ///
    /// Returns `None` if the actor has already stopped.
    pub fn attach(&self, conn_id: String) -> Option<mpsc::UnboundedReceiver<Message>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.commands
            .send(RunnerCommand::Attach { conn_id, sender })
            .ok()
            .map(|()| receiver)
    }

    pub fn detach(&self, conn_id: String) {
        let _ = self.commands.send(RunnerCommand::Detach { conn_id });
    }

    /// Queue `{key, data, timestamp}` for every attached socket.
    ///
    /// Returns `false` if the payload could not be serialized or the actor
    /// has stopped.
    pub fn notify(&self, key: &str, data: &serde_json::Value, timestamp_ms: i64) -> bool {
        let message = RelayMessage {
            key,
            data,
            timestamp: timestamp_ms,
        };
        match serde_json::to_string(&message) {
            Ok(frame) => self.commands.send(RunnerCommand::Notify { frame }).is_ok(),
            Err(e) => {
                tracing::error!(user_id = %self.user_id, key, error = %e, "Failed to serialize job notification");
                false
            }
        }
    }

    pub fn ping(&self) {
        let _ = self.commands.send(RunnerCommand::Ping);
    }

    /// Number of sockets currently attached (`0` once stopped).
    pub async fn connection_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(RunnerCommand::Count { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Send a Close frame to every socket and stop the actor.
    pub fn close(&self) {
        let _ = self.commands.send(RunnerCommand::Close);
    }

    /// Wait for the actor task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The actor state: one user's sockets.
struct JobRunner {
    user_id: DbId,
    sockets: HashMap<String, ConnSender>,
}

impl JobRunner {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RunnerCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                RunnerCommand::Attach { conn_id, sender } => {
                    self.sockets.insert(conn_id, sender);
                }
                RunnerCommand::Detach { conn_id } => {
                    self.sockets.remove(&conn_id);
                }
                RunnerCommand::Notify { frame } => self.broadcast(&frame),
                RunnerCommand::Ping => {
                    self.sockets
                        .retain(|_, sender| sender.send(Message::Ping(Bytes::new())).is_ok());
                }
                RunnerCommand::Count { reply } => {
                    let _ = reply.send(self.sockets.len());
                }
                RunnerCommand::Close => {
                    for sender in self.sockets.values() {
                        let _ = sender.send(Message::Close(None));
                    }
                    self.sockets.clear();
                    break;
                }
            }
        }
        tracing::debug!(user_id = %self.user_id, "Job runner stopped");
    }

    /// Send one serialized frame to every socket, dropping dead ones.
    fn broadcast(&mut self, frame: &str) {
        let user_id = self.user_id;
        self.sockets.retain(|conn_id, sender| {
            match sender.send(Message::Text(frame.to_owned().into())) {
                Ok(()) => true,
                Err(_) => {
                    tracing::warn!(%user_id, %conn_id, "Dropping closed WebSocket from relay");
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(body) => serde_json::from_str(body.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn notify_fans_out_to_every_socket() {
        let runner = JobRunnerHandle::spawn(DbId::new_v4());
        let mut a = runner.attach("a".into()).unwrap();
        let mut b = runner.attach("b".into()).unwrap();

        let data = serde_json::json!({ "status": "started" });
        assert!(runner.notify("u:k", &data, 1_700_000_000_000));

        for rx in [&mut a, &mut b] {
            let frame = text(rx.recv().await.unwrap());
            assert_eq!(frame["key"], "u:k");
            assert_eq!(frame["data"]["status"], "started");
            assert_eq!(frame["timestamp"], 1_700_000_000_000_i64);
        }
    }

    #[tokio::test]
    async fn notifications_keep_publish_order() {
        let runner = JobRunnerHandle::spawn(DbId::new_v4());
        let mut rx = runner.attach("a".into()).unwrap();

        for status in ["queued", "started", "completed"] {
            runner.notify("u:k", &serde_json::json!({ "status": status }), 0);
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(text(rx.recv().await.unwrap())["data"]["status"].clone());
        }
        assert_eq!(seen, ["queued", "started", "completed"]);
    }

    #[tokio::test]
    async fn detached_and_dead_sockets_are_dropped() {
        let runner = JobRunnerHandle::spawn(DbId::new_v4());
        let _a = runner.attach("a".into()).unwrap();
        let b = runner.attach("b".into()).unwrap();
        let _c = runner.attach("c".into()).unwrap();
        assert_eq!(runner.connection_count().await, 3);

        runner.detach("a".into());
        drop(b);
        runner.notify("u:k", &serde_json::json!({}), 0);

        assert_eq!(runner.connection_count().await, 1);
    }

    #[tokio::test]
    async fn close_sends_close_frames_and_stops() {
        let runner = JobRunnerHandle::spawn(DbId::new_v4());
        let mut rx = runner.attach("a".into()).unwrap();

        runner.close();
        assert!(matches!(rx.recv().await, Some(Message::Close(None))));
        assert!(rx.recv().await.is_none());

        assert_eq!(runner.connection_count().await, 0);
        assert!(runner.attach("late".into()).is_none());
    }
}
