//! Ticket status machine: the transition table, actor gating, and the
//! preconditions attached to individual edges.
//!
//! Everything here is pure. The engine loads the persisted ticket, runs
//! [`check_transition`] (or [`check_assignment`] / [`check_rating`]) against
//! it, and only then performs the guarded write. Modeling the statuses as a
//! closed enum means adding a state forces every match below to be revisited.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Ticket lifecycle status. Stored as the Postgres enum `ticket_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingParts,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::WaitingParts => "waiting_parts",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// All statuses, in lifecycle order.
    pub const ALL: [TicketStatus; 5] = [
        Self::Open,
        Self::InProgress,
        Self::WaitingParts,
        Self::Resolved,
        Self::Closed,
    ];
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Legal destination statuses for a given source status.
///
/// `closed` is terminal: its slice is empty and no edge can leave it.
pub fn allowed_transitions(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        TicketStatus::Open => &[TicketStatus::InProgress],
        TicketStatus::InProgress => &[TicketStatus::WaitingParts, TicketStatus::Resolved],
        TicketStatus::WaitingParts => &[TicketStatus::InProgress],
        TicketStatus::Resolved => &[TicketStatus::Closed, TicketStatus::InProgress],
        TicketStatus::Closed => &[],
    }
}

/// Whether `from -> to` is an edge in the transition table.
pub fn is_legal_transition(from: TicketStatus, to: TicketStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// Role of the user performing an action. Stored as the Postgres enum
/// `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Technician,
    Requester,
}

/// The user requesting a transition, assignment, or rating.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: DbId,
    pub name: String,
    pub role: ActorRole,
}

// ---------------------------------------------------------------------------
// Transition checks
// ---------------------------------------------------------------------------

/// The persisted ticket fields a transition decision depends on.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub ticket_id: DbId,
    pub status: TicketStatus,
    pub requester_id: DbId,
    pub assigned_tech_id: Option<DbId>,
}

/// Validate a requested transition against the current persisted status,
/// the actor, and the edge's preconditions. Read-only: the caller performs
/// the write only after this returns `Ok`.
///
/// Gating rules:
/// - `open -> in_progress`: a technician, either already assigned or
///   claiming the unassigned ticket (the engine sets the assignee).
/// - `in_progress -> waiting_parts | resolved`, `waiting_parts ->
///   in_progress`: the assigned technician. Entering `resolved` requires
///   non-empty resolution text.
/// - `resolved -> closed | in_progress`: the original requester (confirm
///   fix, or reopen).
pub fn check_transition(
    ctx: &TransitionContext,
    to: TicketStatus,
    actor: &Actor,
    resolution_text: Option<&str>,
) -> Result<(), CoreError> {
    if !is_legal_transition(ctx.status, to) {
        return Err(CoreError::InvalidTransition {
            entity: "ticket",
            id: ctx.ticket_id,
            from: ctx.status.to_string(),
            to: to.to_string(),
        });
    }

    match (ctx.status, to) {
        (TicketStatus::Open, TicketStatus::InProgress) => {
            if actor.role != ActorRole::Technician {
                return Err(CoreError::MissingPrecondition(format!(
                    "ticket {} can only be picked up by a technician",
                    ctx.ticket_id
                )));
            }
            if let Some(assigned) = ctx.assigned_tech_id {
                if assigned != actor.id {
                    return Err(CoreError::MissingPrecondition(format!(
                        "ticket {} is assigned to technician {assigned}",
                        ctx.ticket_id
                    )));
                }
            }
        }
        (TicketStatus::InProgress, TicketStatus::WaitingParts)
        | (TicketStatus::InProgress, TicketStatus::Resolved)
        | (TicketStatus::WaitingParts, TicketStatus::InProgress) => {
            if ctx.assigned_tech_id != Some(actor.id) {
                return Err(CoreError::MissingPrecondition(format!(
                    "ticket {} can only be worked by its assigned technician",
                    ctx.ticket_id
                )));
            }
            if to == TicketStatus::Resolved
                && resolution_text.map_or(true, |t| t.trim().is_empty())
            {
                return Err(CoreError::MissingPrecondition(format!(
                    "ticket {} cannot be resolved without resolution text",
                    ctx.ticket_id
                )));
            }
        }
        (TicketStatus::Resolved, TicketStatus::Closed)
        | (TicketStatus::Resolved, TicketStatus::InProgress) => {
            if actor.id != ctx.requester_id {
                return Err(CoreError::MissingPrecondition(format!(
                    "ticket {} can only be closed or reopened by its requester",
                    ctx.ticket_id
                )));
            }
        }
        // Unreachable: is_legal_transition already filtered everything else.
        _ => unreachable!("edge {} -> {} passed legality check", ctx.status, to),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Assignment and rating checks
// ---------------------------------------------------------------------------

/// Validate an assignment request.
///
/// Assignment is a side-channel action independent of status: a technician
/// may claim an unassigned ticket for themselves; an admin may assign or
/// reassign anyone. Terminal tickets cannot be (re)assigned.
pub fn check_assignment(
    ctx: &TransitionContext,
    tech_id: DbId,
    actor: &Actor,
) -> Result<(), CoreError> {
    if ctx.status == TicketStatus::Closed {
        return Err(CoreError::MissingPrecondition(format!(
            "ticket {} is closed and can no longer be assigned",
            ctx.ticket_id
        )));
    }

    match actor.role {
        ActorRole::Admin => Ok(()),
        ActorRole::Technician => {
            if tech_id != actor.id {
                return Err(CoreError::MissingPrecondition(format!(
                    "technician {} may only claim a ticket for themselves",
                    actor.id
                )));
            }
            if ctx.assigned_tech_id.is_some() {
                return Err(CoreError::MissingPrecondition(format!(
                    "ticket {} is already assigned; reassignment requires an admin",
                    ctx.ticket_id
                )));
            }
            Ok(())
        }
        ActorRole::Requester => Err(CoreError::MissingPrecondition(
            "requesters cannot assign tickets".to_string(),
        )),
    }
}

/// Validate a rating request: `closed` tickets only, requester only, once,
/// value in 1..=5.
pub fn check_rating(
    ctx: &TransitionContext,
    existing_rating: Option<i16>,
    rating: i16,
    actor: &Actor,
) -> Result<(), CoreError> {
    if !(1..=5).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    if ctx.status != TicketStatus::Closed {
        return Err(CoreError::MissingPrecondition(format!(
            "ticket {} must be closed before it can be rated (status: {})",
            ctx.ticket_id, ctx.status
        )));
    }
    if existing_rating.is_some() {
        return Err(CoreError::MissingPrecondition(format!(
            "ticket {} has already been rated",
            ctx.ticket_id
        )));
    }
    if actor.id != ctx.requester_id {
        return Err(CoreError::MissingPrecondition(format!(
            "ticket {} can only be rated by its requester",
            ctx.ticket_id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
