//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - Query-parameter structs where the table is queried with filters

pub mod audit;
pub mod mail;
pub mod subscription;
pub mod ticket;
pub mod user;
