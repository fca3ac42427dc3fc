//! Business operations that span several repositories.
//!
//! Handlers stay thin: they parse input, call into these functions, and
//! shape the HTTP response.

pub mod accounts;
pub mod invites;
pub mod workspaces;
