//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where inserts need more than a couple of fields, a create DTO.

pub mod invite;
pub mod job;
pub mod user;
pub mod workspace;
