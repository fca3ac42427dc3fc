//! nvoi API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! the per-user WebSocket relay) so integration tests and the binary
//! entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod oauth;
pub mod relay;
pub mod response;
pub mod router;
pub mod routes;
pub mod services;
pub mod state;
