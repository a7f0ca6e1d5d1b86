//! User entity model (read-only from this engine's point of view).

use opsdesk_core::ticket::ActorRole;
use opsdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table. Users are provisioned externally; the
/// engine reads them for actor names and notification targets.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: ActorRole,
    pub created_at: Timestamp,
}
