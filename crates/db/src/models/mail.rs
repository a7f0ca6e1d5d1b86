//! Outbound mail queue entity model.

use opsdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `mail_queue` table. Write-once: content never changes
/// after insert; only `sent_at` is stamped by the drain job.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedMail {
    pub id: DbId,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub created_at: Timestamp,
    pub sent_at: Option<Timestamp>,
}
