//! Background job execution for nvoi.
//!
//! Jobs are inserted by the API as `queued` rows and a [`JobMessage`] is put
//! on the in-process [`JobQueue`]. The [`QueueConsumer`] pulls messages and
//! hands them to a [`JobHandler`]; the production handler is
//! [`JobProcessor`], which drives the row through `started` and
//! `completed`/`error` and publishes each change on the event bus.

pub mod config;
pub mod error;
pub mod notify;
pub mod processor;
pub mod queue;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use processor::{JobProcessor, JobWork, SimulatedWork};
pub use queue::{JobHandler, JobMessage, JobQueue, QueueConsumer};
