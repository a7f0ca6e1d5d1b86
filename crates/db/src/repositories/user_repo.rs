//! Repository for the `users` table (read-only).

use sqlx::PgPool;

use opsdesk_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` SELECT queries.
const COLUMNS: &str = "id, name, email, role, created_at";

/// Provides lookups against externally-provisioned users.
pub struct UserRepo;

impl UserRepo {
    /// Fetch a user by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
