//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod invite_repo;
pub mod job_repo;
pub mod user_repo;
pub mod workspace_repo;

pub use invite_repo::InviteRepo;
pub use job_repo::JobRepo;
pub use user_repo::UserRepo;
pub use workspace_repo::WorkspaceRepo;
