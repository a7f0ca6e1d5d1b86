use crate::types::DbId;

/// Errors produced by the transactional core.
///
/// Every variant is rejected before any write happens, and carries enough
/// structure (entity, id, offending state, attempted target) for the caller
/// to render a precise message.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The requested status change is not an edge in the transition table
    /// for the entity's current persisted status.
    #[error("Invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: DbId,
        from: String,
        to: String,
    },

    /// A required precondition for the requested action is missing, e.g.
    /// resolving a ticket without resolution text or rating a ticket that
    /// is not closed.
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
