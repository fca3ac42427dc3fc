//! Domain types and invariants shared by every nvoi crate.
//!
//! Nothing in here touches the database or the network; the rules that
//! decide whether a job key, invite transition or password is acceptable
//! live here so they can be unit tested in isolation.

pub mod accounts;
pub mod error;
pub mod invites;
pub mod jobs;
pub mod status;
pub mod types;
