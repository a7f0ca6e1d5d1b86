//! Repository for the `subscriptions` table.
//!
//! The scanner is the only writer. Both updates are guarded so that a retry
//! or a crashed-and-resumed run is harmless: expiring an already-expired
//! row or re-setting an already-set reminder flag affects zero rows.

use sqlx::{PgConnection, PgPool};

use opsdesk_core::subscription::ReminderLevel;
use opsdesk_core::types::DbId;

use crate::models::subscription::Subscription;

/// Column list for `subscriptions` SELECT queries.
const COLUMNS: &str = "\
    id, name, vendor, created_by, status, expiry_date, auto_renew, \
    reminder_sent_h30, reminder_sent_h14, reminder_sent_h7, \
    reminder_sent_h1, created_at, updated_at";

/// Provides scan queries and guarded updates for subscriptions.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// All subscriptions the daily scan evaluates: non-terminal status and
    /// auto-renew off. Auto-renewing subscriptions are excluded entirely.
    pub async fn list_scannable(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions \
             WHERE status IN ('active', 'expiring_soon') AND auto_renew = FALSE \
             ORDER BY expiry_date, id"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .fetch_all(pool)
            .await
    }

    /// Flip a subscription to `expired`. Returns `false` when the row was
    /// already expired (or cancelled), making the operation idempotent.
    pub async fn mark_expired(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired', updated_at = NOW() \
             WHERE id = $1 AND status IN ('active', 'expiring_soon')",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set one reminder level's idempotency flag and escalate the status to
    /// `expiring_soon`. Returns `false` when the flag was already set or
    /// the subscription is no longer scannable — the caller must not emit a
    /// notification in that case.
    ///
    /// The flag column is interpolated from a closed enum, never from
    /// caller input.
    pub async fn mark_reminded(
        conn: &mut PgConnection,
        id: DbId,
        level: ReminderLevel,
    ) -> Result<bool, sqlx::Error> {
        let flag = level.flag_column();
        let query = format!(
            "UPDATE subscriptions SET \
                {flag} = TRUE, \
                status = 'expiring_soon', \
                updated_at = NOW() \
             WHERE id = $1 AND {flag} = FALSE \
               AND status IN ('active', 'expiring_soon')"
        );
        let result = sqlx::query(&query).bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }
}
