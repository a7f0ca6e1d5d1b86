//! Subscription expiry scan planning.
//!
//! [`plan_scan`] is the pure decision function behind the daily scanner: it
//! maps one subscription's persisted state plus today's date to at most one
//! [`ScanAction`]. The engine computes every action before performing any
//! write, so a run either commits all of its decisions or none of them.
//!
//! Threshold checks use strict equality on the whole-day difference, not
//! ranges: a subscription that is never scanned on exactly day 14 (scanner
//! downtime) silently skips that level. This mirrors the documented product
//! behavior; switching to `>=` would change notification volume.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Subscription lifecycle status. Stored as the Postgres enum
/// `subscription_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    ExpiringSoon,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Reminder levels
// ---------------------------------------------------------------------------

/// One of the four escalating day-thresholds before expiry. Each level is
/// independently idempotent: its flag is set exactly once and never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderLevel {
    H30,
    H14,
    H7,
    H1,
}

impl ReminderLevel {
    /// Levels in rule-priority order (first match wins).
    pub const ALL: [ReminderLevel; 4] = [Self::H30, Self::H14, Self::H7, Self::H1];

    /// Whole-day threshold this level fires at.
    pub fn days(&self) -> i64 {
        match self {
            Self::H30 => 30,
            Self::H14 => 14,
            Self::H7 => 7,
            Self::H1 => 1,
        }
    }

    /// Human-facing label used in notification subjects and audit details.
    pub fn label(&self) -> &'static str {
        match self {
            Self::H30 => "30 Hari",
            Self::H14 => "14 Hari",
            Self::H7 => "7 Hari",
            Self::H1 => "1 Hari",
        }
    }

    /// Column name of the idempotency flag backing this level.
    pub fn flag_column(&self) -> &'static str {
        match self {
            Self::H30 => "reminder_sent_h30",
            Self::H14 => "reminder_sent_h14",
            Self::H7 => "reminder_sent_h7",
            Self::H1 => "reminder_sent_h1",
        }
    }
}

// ---------------------------------------------------------------------------
// Scan state and planning
// ---------------------------------------------------------------------------

/// The subscription fields a scan decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct ScanState {
    pub status: SubscriptionStatus,
    pub expiry_date: NaiveDate,
    pub reminder_sent_h30: bool,
    pub reminder_sent_h14: bool,
    pub reminder_sent_h7: bool,
    pub reminder_sent_h1: bool,
}

impl ScanState {
    fn flag(&self, level: ReminderLevel) -> bool {
        match level {
            ReminderLevel::H30 => self.reminder_sent_h30,
            ReminderLevel::H14 => self.reminder_sent_h14,
            ReminderLevel::H7 => self.reminder_sent_h7,
            ReminderLevel::H1 => self.reminder_sent_h1,
        }
    }

    /// Apply an action's effects to this state.
    ///
    /// This is the in-memory mirror of the guarded SQL update the scanner
    /// performs; the idempotence tests re-plan against the applied state.
    pub fn apply(&mut self, action: ScanAction) {
        match action {
            ScanAction::Expire => self.status = SubscriptionStatus::Expired,
            ScanAction::Remind(level) => {
                match level {
                    ReminderLevel::H30 => self.reminder_sent_h30 = true,
                    ReminderLevel::H14 => self.reminder_sent_h14 = true,
                    ReminderLevel::H7 => self.reminder_sent_h7 = true,
                    ReminderLevel::H1 => self.reminder_sent_h1 = true,
                }
                // Status escalates on the first reminder and never regresses.
                if self.status == SubscriptionStatus::Active {
                    self.status = SubscriptionStatus::ExpiringSoon;
                }
            }
        }
    }
}

/// The single action a scan run takes for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAction {
    /// The expiry date has passed: flip to `expired`. No reminder is emitted
    /// on the same pass that expires.
    Expire,
    /// Emit the reminder for this level and set its flag.
    Remind(ReminderLevel),
}

/// Whole-day difference between the expiry date and today (both at
/// midnight). Negative once the expiry date has passed.
pub fn days_until_expiry(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiry_date - today).num_days()
}

/// Decide the scan action for one subscription, first match wins.
///
/// Only `active` / `expiring_soon` subscriptions are scannable; anything
/// else yields no action. Rule order: expiry beats every reminder, then the
/// 30/14/7/1-day levels in descending order, each gated on its own flag.
pub fn plan_scan(state: &ScanState, today: NaiveDate) -> Option<ScanAction> {
    match state.status {
        SubscriptionStatus::Active | SubscriptionStatus::ExpiringSoon => {}
        SubscriptionStatus::Expired | SubscriptionStatus::Cancelled => return None,
    }

    let days_diff = days_until_expiry(state.expiry_date, today);

    if days_diff <= 0 {
        return Some(ScanAction::Expire);
    }

    for level in ReminderLevel::ALL {
        if days_diff == level.days() && !state.flag(level) {
            return Some(ScanAction::Remind(level));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
