//! Ticket entity model and DTOs.

use opsdesk_core::sla::Priority;
use opsdesk_core::ticket::{TicketStatus, TransitionContext};
use opsdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Ticket entity
// ---------------------------------------------------------------------------

/// A row from the `tickets` table.
///
/// `sla_response_met` / `sla_resolution_met` are tri-state: `None` until the
/// corresponding deadline has been evaluated, then set once and immutable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ticket {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub requester_id: DbId,
    pub assigned_tech_id: Option<DbId>,
    pub resolution: Option<String>,
    pub rating: Option<i16>,
    pub sla_response_target: Timestamp,
    pub sla_resolution_target: Timestamp,
    pub sla_response_met: Option<bool>,
    pub sla_resolution_met: Option<bool>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Ticket {
    /// Project the fields transition decisions depend on.
    pub fn transition_context(&self) -> TransitionContext {
        TransitionContext {
            ticket_id: self.id,
            status: self.status,
            requester_id: self.requester_id,
            assigned_tech_id: self.assigned_tech_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// The ticket-creation contract from external intake.
///
/// `priority` arrives as a free-form label; unrecognized values fall back to
/// the medium SLA offsets at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicket {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub requester_id: DbId,
}

/// Fully-resolved insert row: priority parsed, SLA targets computed.
/// Built by the engine, never by callers.
#[derive(Debug, Clone)]
pub struct InsertTicket {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub requester_id: DbId,
    pub sla_response_target: Timestamp,
    pub sla_resolution_target: Timestamp,
}
