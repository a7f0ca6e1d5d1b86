//! Subscription entity model.

use chrono::NaiveDate;
use opsdesk_core::subscription::{ScanState, SubscriptionStatus};
use opsdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `subscriptions` table.
///
/// Subscriptions are created externally with `expiry_date` set; the scanner
/// is the only writer here until `expired` (cancellation and renewal happen
/// outside this engine).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub name: String,
    pub vendor: String,
    pub created_by: Option<DbId>,
    pub status: SubscriptionStatus,
    pub expiry_date: NaiveDate,
    pub auto_renew: bool,
    pub reminder_sent_h30: bool,
    pub reminder_sent_h14: bool,
    pub reminder_sent_h7: bool,
    pub reminder_sent_h1: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Project the fields the scan planner depends on.
    pub fn scan_state(&self) -> ScanState {
        ScanState {
            status: self.status,
            expiry_date: self.expiry_date,
            reminder_sent_h30: self.reminder_sent_h30,
            reminder_sent_h14: self.reminder_sent_h14,
            reminder_sent_h7: self.reminder_sent_h7,
            reminder_sent_h1: self.reminder_sent_h1,
        }
    }
}
