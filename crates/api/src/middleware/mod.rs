//! Session extractors.
//!
//! - [`auth::Session`] -- The raw session payload; never rejects.
//! - [`auth::MaybeUser`] -- The logged-in user, if any; never rejects.
//! - [`auth::AuthUser`] -- Requires a user, rejecting with 401 JSON (API routes).
//! - [`auth::RequireUser`] -- Requires a user, redirecting to `/` (page routes).

pub mod auth;
