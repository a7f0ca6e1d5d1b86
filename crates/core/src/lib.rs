//! Pure domain logic for the opsdesk lifecycle engine.
//!
//! This crate has no I/O: it defines the closed status/priority enums, the
//! SLA deadline table, the ticket transition rules, the subscription scan
//! planner, audit constants, and the daily schedule gate. The `db` and
//! `engine` crates build on these types; keeping them here means the rules
//! can be tested without a database.

pub mod audit;
pub mod error;
pub mod schedule;
pub mod sla;
pub mod subscription;
pub mod ticket;
pub mod types;

pub use error::CoreError;
