//! Repository for the `mail_queue` table.

use sqlx::{PgConnection, PgPool};

use opsdesk_core::types::DbId;

use crate::models::mail::QueuedMail;

/// Column list for `mail_queue` SELECT queries.
const COLUMNS: &str = "id, recipients, subject, body, created_at, sent_at";

/// Provides enqueue and drain operations for the outbound mail queue.
pub struct MailRepo;

impl MailRepo {
    /// Enqueue one outbound message, returning the generated ID.
    ///
    /// Takes a connection so the scanner can enqueue inside the same
    /// transaction as the entity mutation and audit entry.
    pub async fn enqueue(
        conn: &mut PgConnection,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO mail_queue (recipients, subject, body) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(recipients)
        .bind(subject)
        .bind(body)
        .fetch_one(conn)
        .await
    }

    /// Oldest unsent messages, up to `limit`.
    pub async fn list_unsent(pool: &PgPool, limit: i64) -> Result<Vec<QueuedMail>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM mail_queue \
             WHERE sent_at IS NULL \
             ORDER BY created_at, id \
             LIMIT $1"
        );
        sqlx::query_as::<_, QueuedMail>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Stamp a message as sent. Returns `false` if it was already stamped.
    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE mail_queue SET sent_at = NOW() \
             WHERE id = $1 AND sent_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
