//! Per-user WebSocket relay for job status updates.
//!
//! Job changes flow `EventBus` -> [`NotificationRelay`] -> [`RelayHub`] ->
//! the user's [`runner::JobRunnerHandle`] actor -> each of that user's open
//! sockets.

mod handler;
mod heartbeat;
pub mod hub;
pub mod notifications;
pub mod runner;

pub use handler::jobs_ws_handler;
pub use heartbeat::start_heartbeat;
pub use hub::RelayHub;
pub use notifications::NotificationRelay;
