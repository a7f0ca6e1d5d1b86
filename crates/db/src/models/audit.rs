//! Audit trail entity model and DTOs.
//!
//! Audit entries are immutable records of one state change each; there is
//! no update DTO because no update exists.

use opsdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Audit entry entity
// ---------------------------------------------------------------------------

/// A single audit trail entry. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: String,
    /// NULL for entries written by the scanner rather than a user.
    pub action_by: Option<DbId>,
    pub action_by_name: String,
    pub details: String,
    pub changes: Option<serde_json::Value>,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for appending a new audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub entity_type: &'static str,
    pub entity_id: DbId,
    pub action: &'static str,
    pub action_by: Option<DbId>,
    pub action_by_name: String,
    pub details: String,
    pub changes: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter parameters for querying the audit trail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub action: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
