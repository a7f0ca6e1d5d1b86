//! SLA deadline calculation.
//!
//! [`sla_targets`] is the single place response/resolution deadlines come
//! from. It is called exactly once, at ticket creation, and the result is
//! persisted — targets are never recomputed, so later clock drift or
//! priority edits do not retroactively change historical deadlines.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Ticket priority tier. Stored as the Postgres enum `ticket_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Parse a priority label from external intake.
    ///
    /// Unrecognized labels fall back to [`Priority::Medium`], which carries
    /// the default SLA offsets.
    pub fn parse_or_default(label: &str) -> Self {
        match label {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Target computation
// ---------------------------------------------------------------------------

/// The two deadlines attached to a ticket at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaTargets {
    /// Instant by which the ticket must receive a first response.
    pub response_target: Timestamp,
    /// Instant by which the ticket must be resolved.
    pub resolution_target: Timestamp,
}

/// Compute SLA targets for a priority, anchored at `now`.
///
/// | priority | response | resolution |
/// |----------|----------|------------|
/// | critical | +1 hour  | +4 hours   |
/// | high     | +2 hours | +12 hours  |
/// | medium   | +1 day   | +3 days    |
/// | low      | +2 days  | +7 days    |
pub fn sla_targets(priority: Priority, now: Timestamp) -> SlaTargets {
    let (response, resolution) = match priority {
        Priority::Critical => (Duration::hours(1), Duration::hours(4)),
        Priority::High => (Duration::hours(2), Duration::hours(12)),
        Priority::Medium => (Duration::days(1), Duration::days(3)),
        Priority::Low => (Duration::days(2), Duration::days(7)),
    };
    SlaTargets {
        response_target: now + response,
        resolution_target: now + resolution,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
