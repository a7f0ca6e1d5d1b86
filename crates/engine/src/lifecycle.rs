//! Ticket lifecycle service.
//!
//! Each operation is a read-validate-transact unit: load the ticket, run the
//! pure checks from `opsdesk_core::ticket`, then perform a guarded write and
//! the matching audit entry in one transaction. The guard (`WHERE status =
//! $from` and friends) re-checks the validated precondition at write time,
//! so of two concurrent requests racing on the same ticket exactly one
//! succeeds; the loser re-reads and receives a typed rejection against the
//! post-race state.
//!
//! Notifications run after commit and are best-effort: a sink failure is
//! logged and never rolls back the state change.

use std::sync::Arc;

use chrono::Utc;

use opsdesk_core::audit::{actions, change_set, entity_types};
use opsdesk_core::sla::{sla_targets, Priority};
use opsdesk_core::ticket::{
    check_assignment, check_rating, check_transition, Actor, ActorRole, TicketStatus,
};
use opsdesk_core::types::DbId;
use opsdesk_core::CoreError;
use opsdesk_db::models::audit::NewAuditEntry;
use opsdesk_db::models::ticket::{CreateTicket, InsertTicket, Ticket};
use opsdesk_db::models::user::User;
use opsdesk_db::repositories::{AuditRepo, TicketRepo, UserRepo};
use opsdesk_db::DbPool;

use crate::error::EngineResult;
use crate::notify::{self, NotificationSink};

// ---------------------------------------------------------------------------
// Request contracts
// ---------------------------------------------------------------------------

/// The status-change contract: caller identifies the ticket, the target
/// status, and themselves; resolution text travels with the request when
/// entering `resolved`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub ticket_id: DbId,
    pub target: TicketStatus,
    pub actor_id: DbId,
    pub actor_name: String,
    pub resolution: Option<String>,
}

/// Side-channel assignment request (independent of status).
#[derive(Debug, Clone)]
pub struct Assignment {
    pub ticket_id: DbId,
    pub tech_id: DbId,
    pub actor_id: DbId,
    pub actor_name: String,
}

/// Post-closure rating request.
#[derive(Debug, Clone)]
pub struct Rating {
    pub ticket_id: DbId,
    pub actor_id: DbId,
    pub actor_name: String,
    pub rating: i16,
}

// ---------------------------------------------------------------------------
// TicketLifecycle
// ---------------------------------------------------------------------------

/// Drives ticket creation, status transitions, assignment, and rating.
pub struct TicketLifecycle {
    pool: DbPool,
    sink: Arc<dyn NotificationSink>,
    /// Operations address that receives ticket-creation notifications.
    ops_email: String,
}

impl TicketLifecycle {
    pub fn new(pool: DbPool, sink: Arc<dyn NotificationSink>, ops_email: String) -> Self {
        Self { pool, sink, ops_email }
    }

    /// Create a ticket: parse the priority label, compute SLA targets once,
    /// persist ticket + audit entry atomically, then notify operations.
    pub async fn create(&self, req: CreateTicket) -> EngineResult<Ticket> {
        if req.title.trim().is_empty() {
            return Err(CoreError::Validation("ticket title must not be empty".into()).into());
        }

        let requester = self.load_user(req.requester_id).await?;

        let priority = Priority::parse_or_default(&req.priority);
        let targets = sla_targets(priority, Utc::now());

        let insert = InsertTicket {
            title: req.title,
            description: req.description,
            priority,
            requester_id: requester.id,
            sla_response_target: targets.response_target,
            sla_resolution_target: targets.resolution_target,
        };

        let mut tx = self.pool.begin().await?;
        let ticket = TicketRepo::insert(&mut tx, &insert).await?;
        AuditRepo::append(
            &mut tx,
            &NewAuditEntry {
                entity_type: entity_types::TICKET,
                entity_id: ticket.id,
                action: actions::TICKET_CREATE,
                action_by: Some(requester.id),
                action_by_name: requester.name.clone(),
                details: format!(
                    "Ticket \"{}\" created with priority {}",
                    ticket.title, ticket.priority
                ),
                changes: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            ticket_id = ticket.id,
            priority = %ticket.priority,
            "Ticket created"
        );

        self.notify_best_effort(&notify::ticket_created(&ticket, &self.ops_email))
            .await;

        Ok(ticket)
    }

    /// Apply one status transition. Typed rejections (`InvalidTransition`,
    /// `MissingPrecondition`, `NotFound`) are decided before any write.
    pub async fn change_status(&self, req: StatusChange) -> EngineResult<Ticket> {
        let ticket = self.load_ticket(req.ticket_id).await?;
        let actor_user = self.load_user(req.actor_id).await?;
        let actor = Actor {
            id: actor_user.id,
            name: req.actor_name.clone(),
            role: actor_user.role,
        };

        let ctx = ticket.transition_context();
        check_transition(&ctx, req.target, &actor, req.resolution.as_deref())?;

        let now = Utc::now();
        let from = ticket.status;
        let to = req.target;

        // First response: evaluated once, at open -> in_progress.
        let response_met = (from == TicketStatus::Open && to == TicketStatus::InProgress)
            .then(|| now <= ticket.sla_response_target);
        // Resolution deadline: evaluated on entering resolved (or closed);
        // COALESCE in the update keeps the first evaluation immutable.
        let resolution_met = (to == TicketStatus::Resolved || to == TicketStatus::Closed)
            .then(|| now <= ticket.sla_resolution_target);
        // A technician picking up an unassigned open ticket claims it.
        let claim_tech = (from == TicketStatus::Open && ticket.assigned_tech_id.is_none())
            .then_some(actor.id);
        let resolution = if to == TicketStatus::Resolved {
            req.resolution.as_deref()
        } else {
            None
        };

        let mut tx = self.pool.begin().await?;
        let updated = TicketRepo::update_status(
            &mut tx,
            ticket.id,
            from,
            to,
            resolution,
            response_met,
            resolution_met,
            claim_tech,
        )
        .await?;

        let Some(updated) = updated else {
            // Lost a race: the persisted status (or, for a claiming
            // transition, the assignee) moved between our read and the
            // guarded write. Report against the current state.
            let state = TicketRepo::find_guard_state(&mut tx, ticket.id).await?;
            drop(tx);
            return Err(match state {
                None => CoreError::NotFound { entity: "ticket", id: ticket.id }.into(),
                Some((current, _)) if current != from => CoreError::InvalidTransition {
                    entity: "ticket",
                    id: ticket.id,
                    from: current.to_string(),
                    to: to.to_string(),
                }
                .into(),
                Some(_) => CoreError::MissingPrecondition(format!(
                    "ticket {} was claimed by another technician",
                    ticket.id
                ))
                .into(),
            });
        };

        AuditRepo::append(
            &mut tx,
            &NewAuditEntry {
                entity_type: entity_types::TICKET,
                entity_id: updated.id,
                action: actions::STATUS_CHANGE,
                action_by: Some(actor.id),
                action_by_name: actor.name.clone(),
                details: format!("Status changed from {from} to {to}"),
                changes: Some(change_set(&[("status", from.as_str(), to.as_str())])),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            ticket_id = updated.id,
            from = %from,
            to = %to,
            actor_id = actor.id,
            "Ticket status changed"
        );

        Ok(updated)
    }

    /// Assign or claim a ticket. Independent of status transitions; one
    /// audit entry of its own.
    pub async fn assign(&self, req: Assignment) -> EngineResult<Ticket> {
        let ticket = self.load_ticket(req.ticket_id).await?;
        let actor_user = self.load_user(req.actor_id).await?;
        let actor = Actor {
            id: actor_user.id,
            name: req.actor_name.clone(),
            role: actor_user.role,
        };

        check_assignment(&ticket.transition_context(), req.tech_id, &actor)?;

        let tech = self.load_user(req.tech_id).await?;

        let previous = ticket
            .assigned_tech_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unassigned".to_string());

        let mut tx = self.pool.begin().await?;
        // Technician self-claims go through the unassigned-only guard, so
        // two racing claims cannot both win; admin (re)assignment only
        // requires the ticket is not closed.
        let updated = if actor.role == ActorRole::Technician {
            TicketRepo::claim(&mut tx, ticket.id, tech.id).await?
        } else {
            TicketRepo::set_assignee(&mut tx, ticket.id, tech.id).await?
        };
        let Some(updated) = updated else {
            let state = TicketRepo::find_guard_state(&mut tx, ticket.id).await?;
            drop(tx);
            return Err(match state {
                None => CoreError::NotFound { entity: "ticket", id: ticket.id }.into(),
                Some((TicketStatus::Closed, _)) => CoreError::MissingPrecondition(format!(
                    "ticket {} is closed and can no longer be assigned",
                    ticket.id
                ))
                .into(),
                Some(_) => CoreError::MissingPrecondition(format!(
                    "ticket {} is already assigned; reassignment requires an admin",
                    ticket.id
                ))
                .into(),
            });
        };

        AuditRepo::append(
            &mut tx,
            &NewAuditEntry {
                entity_type: entity_types::TICKET,
                entity_id: updated.id,
                action: actions::TICKET_ASSIGN,
                action_by: Some(actor.id),
                action_by_name: actor.name.clone(),
                details: format!("Assigned to {}", tech.name),
                changes: Some(change_set(&[(
                    "assigned_tech_id",
                    &previous,
                    &tech.id.to_string(),
                )])),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = updated.id, tech_id = tech.id, "Ticket assigned");

        self.notify_best_effort(&notify::ticket_assigned(&updated, &tech.email))
            .await;

        Ok(updated)
    }

    /// Accept the requester's rating of a closed ticket, once.
    pub async fn rate(&self, req: Rating) -> EngineResult<Ticket> {
        let ticket = self.load_ticket(req.ticket_id).await?;
        let actor_user = self.load_user(req.actor_id).await?;
        let actor = Actor {
            id: actor_user.id,
            name: req.actor_name.clone(),
            role: actor_user.role,
        };

        check_rating(&ticket.transition_context(), ticket.rating, req.rating, &actor)?;

        let mut tx = self.pool.begin().await?;
        let updated = TicketRepo::set_rating(&mut tx, ticket.id, req.rating).await?;
        let Some(updated) = updated else {
            drop(tx);
            return Err(CoreError::MissingPrecondition(format!(
                "ticket {} has already been rated or is not closed",
                ticket.id
            ))
            .into());
        };

        AuditRepo::append(
            &mut tx,
            &NewAuditEntry {
                entity_type: entity_types::TICKET,
                entity_id: updated.id,
                action: actions::TICKET_RATE,
                action_by: Some(actor.id),
                action_by_name: actor.name.clone(),
                details: format!("Rated {} out of 5", req.rating),
                changes: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = updated.id, rating = req.rating, "Ticket rated");

        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_ticket(&self, id: DbId) -> EngineResult<Ticket> {
        TicketRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::NotFound { entity: "ticket", id }.into())
    }

    async fn load_user(&self, id: DbId) -> EngineResult<User> {
        UserRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::NotFound { entity: "user", id }.into())
    }

    /// Post-commit notification: failures are logged, never propagated.
    async fn notify_best_effort(&self, request: &notify::NotificationRequest) {
        if let Err(e) = self.sink.enqueue(request).await {
            tracing::warn!(
                subject = %request.subject,
                error = %e,
                "Notification enqueue failed; state change already committed"
            );
        }
    }
}
