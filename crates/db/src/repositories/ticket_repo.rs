//! Repository for the `tickets` table.
//!
//! Every status-changing update here is guarded: the WHERE clause re-checks
//! the precondition the caller validated against its earlier read, so two
//! concurrent requests racing on the same ticket cannot both succeed from a
//! stale read. Zero rows affected means the caller lost the race (or the
//! ticket vanished) and must re-read to produce a precise rejection.

use sqlx::{PgConnection, PgPool};

use opsdesk_core::ticket::TicketStatus;
use opsdesk_core::types::DbId;

use crate::models::ticket::{InsertTicket, Ticket};

/// Column list for `tickets` SELECT queries.
const COLUMNS: &str = "\
    id, title, description, priority, status, requester_id, \
    assigned_tech_id, resolution, rating, sla_response_target, \
    sla_resolution_target, sla_response_met, sla_resolution_met, \
    created_at, updated_at";

/// Provides query and guarded-update operations for tickets.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a new ticket in `open` status with its precomputed SLA targets.
    pub async fn insert(conn: &mut PgConnection, t: &InsertTicket) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets \
             (title, description, priority, requester_id, \
              sla_response_target, sla_resolution_target) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(&t.title)
            .bind(&t.description)
            .bind(t.priority)
            .bind(t.requester_id)
            .bind(t.sla_response_target)
            .bind(t.sla_resolution_target)
            .fetch_one(conn)
            .await
    }

    /// Fetch a ticket by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-read the guarded columns, status and assignee, so the caller can
    /// report a precise rejection after a lost race.
    pub async fn find_guard_state(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<(TicketStatus, Option<DbId>)>, sqlx::Error> {
        sqlx::query_as::<_, (TicketStatus, Option<DbId>)>(
            "SELECT status, assigned_tech_id FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Guarded status transition: only applies when the persisted status
    /// still equals `from`. Returns the updated row, or `None` when the
    /// guard failed.
    ///
    /// The SLA-met flags use `COALESCE(existing, $new)` so they are
    /// write-once: a value evaluated at an earlier transition is never
    /// overwritten. `claim_tech` sets the assignee when a technician
    /// self-assigns by picking up an open ticket; passing it extends the
    /// guard to require the ticket is still unassigned, so two racing
    /// claims cannot both win.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        from: TicketStatus,
        to: TicketStatus,
        resolution: Option<&str>,
        response_met: Option<bool>,
        resolution_met: Option<bool>,
        claim_tech: Option<DbId>,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET \
                status = $3, \
                resolution = COALESCE($4, resolution), \
                sla_response_met = COALESCE(sla_response_met, $5), \
                sla_resolution_met = COALESCE(sla_resolution_met, $6), \
                assigned_tech_id = COALESCE($7, assigned_tech_id), \
                updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
               AND ($7 IS NULL OR assigned_tech_id IS NULL) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(resolution)
            .bind(response_met)
            .bind(resolution_met)
            .bind(claim_tech)
            .fetch_optional(conn)
            .await
    }

    /// Technician self-claim: takes the ticket only while it is still
    /// unassigned and not closed. Zero rows means another technician got
    /// there first (or the ticket closed); the caller re-reads via
    /// [`Self::find_guard_state`] to say which.
    pub async fn claim(
        conn: &mut PgConnection,
        id: DbId,
        tech_id: DbId,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET assigned_tech_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status <> 'closed' AND assigned_tech_id IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(tech_id)
            .fetch_optional(conn)
            .await
    }

    /// Admin (re)assignment: may overwrite an existing assignee. Guarded
    /// against terminal tickets only.
    pub async fn set_assignee(
        conn: &mut PgConnection,
        id: DbId,
        tech_id: DbId,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET assigned_tech_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status <> 'closed' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(tech_id)
            .fetch_optional(conn)
            .await
    }

    /// Record the requester's rating. Guarded: `closed` tickets only, and
    /// only while no rating exists yet.
    pub async fn set_rating(
        conn: &mut PgConnection,
        id: DbId,
        rating: i16,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET rating = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'closed' AND rating IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(rating)
            .fetch_optional(conn)
            .await
    }
}
