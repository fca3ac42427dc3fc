//! nvoi event bus and outbound delivery.
//!
//! - [`EventBus`] carries [`JobUpdate`]s from whoever changes a job row to
//!   whoever relays it to browsers.
//! - [`delivery`] sends workspace invite emails over SMTP.

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, JobUpdate};
pub use delivery::email::{EmailConfig, InviteEmail, InviteMailer};
