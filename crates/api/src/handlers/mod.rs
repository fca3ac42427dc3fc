pub mod anthropic;
pub mod auth;
pub mod dashboard;
pub mod invites;
pub mod jobs;
pub mod oauth;
