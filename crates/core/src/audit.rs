//! Audit trail constants and helpers.
//!
//! Lives in `core` (zero internal deps) so both the repository layer and the
//! worker can tag entries consistently. The trail itself is append-only; the
//! repository exposes no update or delete.

// ---------------------------------------------------------------------------
// Action tags
// ---------------------------------------------------------------------------

/// Known action tags for audit trail entries.
pub mod actions {
    pub const TICKET_CREATE: &str = "ticket_create";
    pub const STATUS_CHANGE: &str = "status_change";
    pub const TICKET_ASSIGN: &str = "ticket_assign";
    pub const TICKET_RATE: &str = "ticket_rate";
    pub const SUBSCRIPTION_REMINDER: &str = "subscription_reminder";
    pub const SUBSCRIPTION_EXPIRE: &str = "subscription_expire";
}

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

/// Known entity types sharing the audit trail. Tickets and subscriptions
/// are written by this engine; assets and documents come from external
/// collaborators using the same interface.
pub mod entity_types {
    pub const TICKET: &str = "ticket";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const ASSET: &str = "asset";
    pub const DOCUMENT: &str = "document";
    pub const SYSTEM: &str = "system";
}

/// Display name recorded for entries written by the scanner rather than a
/// user (`action_by` is NULL for these).
pub const SYSTEM_ACTOR_NAME: &str = "System";

// ---------------------------------------------------------------------------
// Change sets
// ---------------------------------------------------------------------------

/// Build the `changes` JSON for an audit entry: a map of field name to
/// `{"old": ..., "new": ...}` pairs.
pub fn change_set(changes: &[(&str, &str, &str)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (field, old, new) in changes {
        map.insert(
            (*field).to_string(),
            serde_json::json!({ "old": old, "new": new }),
        );
    }
    serde_json::Value::Object(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_set_shape() {
        let v = change_set(&[("status", "open", "in_progress")]);
        assert_eq!(v["status"]["old"], "open");
        assert_eq!(v["status"]["new"], "in_progress");
    }

    #[test]
    fn change_set_multiple_fields() {
        let v = change_set(&[
            ("status", "resolved", "closed"),
            ("sla_resolution_met", "unknown", "true"),
        ]);
        assert_eq!(v.as_object().unwrap().len(), 2);
        assert_eq!(v["sla_resolution_met"]["new"], "true");
    }
}
