//! Subscription expiry scanner.
//!
//! [`ExpiryScanner::run_once`] is one scan pass: read every scannable
//! subscription, plan every action with the pure planner, then apply the
//! whole plan in a single transaction — each mutated subscription gets one
//! guarded write, one audit entry, and (for reminders) one mail row. An
//! empty plan performs zero writes.
//!
//! Idempotency is the central correctness property here: the reminder flags
//! and status guards live in the UPDATE statements themselves, so a re-run
//! on the same day, or a crashed run retried next cycle, re-sends nothing
//! and never un-expires a subscription.

use chrono::NaiveDate;

use opsdesk_core::audit::{actions, change_set, entity_types, SYSTEM_ACTOR_NAME};
use opsdesk_core::subscription::{plan_scan, ReminderLevel, ScanAction};
use opsdesk_db::models::audit::NewAuditEntry;
use opsdesk_db::models::subscription::Subscription;
use opsdesk_db::repositories::{AuditRepo, MailRepo, SubscriptionRepo, UserRepo};
use opsdesk_db::DbPool;

use crate::error::EngineResult;
use crate::notify;

// ---------------------------------------------------------------------------
// ScanSummary
// ---------------------------------------------------------------------------

/// Outcome of one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Subscriptions evaluated this pass.
    pub scanned: usize,
    /// Subscriptions flipped to `expired`.
    pub expired: usize,
    /// Reminders emitted (audit entry + queued mail each).
    pub reminders: usize,
    /// Planned actions skipped because the guarded write affected zero rows
    /// (another run got there first).
    pub skipped: usize,
}

impl ScanSummary {
    /// Whether this pass wrote anything.
    pub fn changed(&self) -> bool {
        self.expired > 0 || self.reminders > 0
    }
}

// ---------------------------------------------------------------------------
// ExpiryScanner
// ---------------------------------------------------------------------------

/// The recurring job evaluating subscriptions against the current date.
pub struct ExpiryScanner {
    pool: DbPool,
    /// Operations address used when a subscription's creator cannot be
    /// resolved to an email address.
    fallback_email: String,
}

impl ExpiryScanner {
    pub fn new(pool: DbPool, fallback_email: String) -> Self {
        Self { pool, fallback_email }
    }

    /// Run one scan pass for the given calendar date.
    pub async fn run_once(&self, today: NaiveDate) -> EngineResult<ScanSummary> {
        let subscriptions = SubscriptionRepo::list_scannable(&self.pool).await?;

        let mut summary = ScanSummary { scanned: subscriptions.len(), ..Default::default() };

        // Read-then-decide-then-write: every decision is made before any
        // write happens.
        let plan: Vec<(Subscription, ScanAction)> = subscriptions
            .into_iter()
            .filter_map(|sub| plan_scan(&sub.scan_state(), today).map(|action| (sub, action)))
            .collect();

        if plan.is_empty() {
            tracing::debug!(scanned = summary.scanned, "Expiry scan: nothing to do");
            return Ok(summary);
        }

        // Recipient lookups are reads; do them before opening the
        // transaction. A failed lookup falls back to the operations address
        // and is only a warning.
        let mut reminders: Vec<(Subscription, ReminderLevel, String)> = Vec::new();
        let mut expirations: Vec<Subscription> = Vec::new();
        for (sub, action) in plan {
            match action {
                ScanAction::Expire => expirations.push(sub),
                ScanAction::Remind(level) => {
                    let recipient = self.resolve_recipient(&sub).await;
                    reminders.push((sub, level, recipient));
                }
            }
        }

        let mut tx = self.pool.begin().await?;

        for sub in &expirations {
            if !SubscriptionRepo::mark_expired(&mut tx, sub.id).await? {
                summary.skipped += 1;
                continue;
            }
            AuditRepo::append(
                &mut tx,
                &NewAuditEntry {
                    entity_type: entity_types::SUBSCRIPTION,
                    entity_id: sub.id,
                    action: actions::SUBSCRIPTION_EXPIRE,
                    action_by: None,
                    action_by_name: SYSTEM_ACTOR_NAME.to_string(),
                    details: format!(
                        "Subscription \"{}\" expired on {}",
                        sub.name, sub.expiry_date
                    ),
                    changes: Some(change_set(&[("status", sub.status.as_str(), "expired")])),
                },
            )
            .await?;
            summary.expired += 1;
        }

        for (sub, level, recipient) in &reminders {
            if !SubscriptionRepo::mark_reminded(&mut tx, sub.id, *level).await? {
                summary.skipped += 1;
                continue;
            }
            AuditRepo::append(
                &mut tx,
                &NewAuditEntry {
                    entity_type: entity_types::SUBSCRIPTION,
                    entity_id: sub.id,
                    action: actions::SUBSCRIPTION_REMINDER,
                    action_by: None,
                    action_by_name: SYSTEM_ACTOR_NAME.to_string(),
                    details: format!(
                        "Expiry reminder {} sent for subscription \"{}\"",
                        level.label(),
                        sub.name
                    ),
                    changes: None,
                },
            )
            .await?;

            let request = notify::subscription_reminder(sub, *level, recipient);
            MailRepo::enqueue(&mut tx, &request.to, &request.subject, &request.body).await?;
            summary.reminders += 1;
        }

        tx.commit().await?;

        tracing::info!(
            scanned = summary.scanned,
            expired = summary.expired,
            reminders = summary.reminders,
            skipped = summary.skipped,
            "Expiry scan complete"
        );

        Ok(summary)
    }

    /// The subscription's creator if resolvable, else the fallback address.
    async fn resolve_recipient(&self, sub: &Subscription) -> String {
        let Some(creator_id) = sub.created_by else {
            return self.fallback_email.clone();
        };
        match UserRepo::find_by_id(&self.pool, creator_id).await {
            Ok(Some(user)) => user.email,
            Ok(None) => {
                tracing::warn!(
                    subscription_id = sub.id,
                    creator_id,
                    "Subscription creator not found; using fallback address"
                );
                self.fallback_email.clone()
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = sub.id,
                    creator_id,
                    error = %e,
                    "Creator lookup failed; using fallback address"
                );
                self.fallback_email.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_reports_no_change() {
        assert!(!ScanSummary::default().changed());
    }

    #[test]
    fn summary_with_work_reports_change() {
        let s = ScanSummary { scanned: 3, expired: 1, reminders: 0, skipped: 0 };
        assert!(s.changed());
        let s = ScanSummary { scanned: 3, expired: 0, reminders: 2, skipped: 0 };
        assert!(s.changed());
    }
}
