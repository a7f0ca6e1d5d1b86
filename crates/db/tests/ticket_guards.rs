//! Integration tests for the guarded ticket updates.
//!
//! Exercises the WHERE-clause guards against a real database:
//! - A stale status loses to the transition that committed first
//! - Two technicians racing to claim the same ticket: one winner
//! - SLA-met flags and the rating are write-once
//! - Closed tickets accept no assignment at all

use chrono::{Duration, Utc};
use sqlx::PgPool;

use opsdesk_core::sla::Priority;
use opsdesk_core::ticket::{ActorRole, TicketStatus};
use opsdesk_db::models::ticket::{InsertTicket, Ticket};
use opsdesk_db::repositories::TicketRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str, email: &str, role: ActorRole) -> i64 {
    sqlx::query_scalar("INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_ticket(pool: &PgPool, requester_id: i64) -> Ticket {
    let now = Utc::now();
    let mut conn = pool.acquire().await.unwrap();
    TicketRepo::insert(
        &mut conn,
        &InsertTicket {
            title: "Laptop will not boot".to_string(),
            description: "Black screen on power-on".to_string(),
            priority: Priority::Medium,
            requester_id,
            sla_response_target: now + Duration::days(1),
            sla_resolution_target: now + Duration::days(3),
        },
    )
    .await
    .unwrap()
}

async fn force_status(pool: &PgPool, id: i64, status: TicketStatus) {
    sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Status guard
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn stale_status_loses_to_committed_transition(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let tech = seed_user(&pool, "Budi", "budi@example.com", ActorRole::Technician).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();

    // First writer: open -> in_progress, claiming the ticket.
    let updated = TicketRepo::update_status(
        &mut conn,
        ticket.id,
        TicketStatus::Open,
        TicketStatus::InProgress,
        None,
        Some(true),
        None,
        Some(tech),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.status, TicketStatus::InProgress);
    assert_eq!(updated.assigned_tech_id, Some(tech));
    assert_eq!(updated.sla_response_met, Some(true));

    // Second writer still holds the stale `open` read: zero rows.
    let lost = TicketRepo::update_status(
        &mut conn,
        ticket.id,
        TicketStatus::Open,
        TicketStatus::InProgress,
        None,
        Some(true),
        None,
        None,
    )
    .await
    .unwrap();
    assert!(lost.is_none());

    let (status, assignee) = TicketRepo::find_guard_state(&mut conn, ticket.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, TicketStatus::InProgress);
    assert_eq!(assignee, Some(tech));
}

#[sqlx::test]
async fn claiming_transition_requires_still_unassigned(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let tech_a = seed_user(&pool, "Budi", "budi@example.com", ActorRole::Technician).await;
    let tech_b = seed_user(&pool, "Sari", "sari@example.com", ActorRole::Technician).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();
    TicketRepo::claim(&mut conn, ticket.id, tech_a).await.unwrap().unwrap();

    // Ticket is still open, so the status half of the guard passes; the
    // claim half must reject because the assignee changed underneath.
    let lost = TicketRepo::update_status(
        &mut conn,
        ticket.id,
        TicketStatus::Open,
        TicketStatus::InProgress,
        None,
        Some(true),
        None,
        Some(tech_b),
    )
    .await
    .unwrap();
    assert!(lost.is_none());

    let (status, assignee) = TicketRepo::find_guard_state(&mut conn, ticket.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, TicketStatus::Open);
    assert_eq!(assignee, Some(tech_a));
}

// ---------------------------------------------------------------------------
// Assignment guards
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn competing_claims_first_writer_wins(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let tech_a = seed_user(&pool, "Budi", "budi@example.com", ActorRole::Technician).await;
    let tech_b = seed_user(&pool, "Sari", "sari@example.com", ActorRole::Technician).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();
    let won = TicketRepo::claim(&mut conn, ticket.id, tech_a).await.unwrap();
    assert_eq!(won.unwrap().assigned_tech_id, Some(tech_a));

    // Both technicians saw an unassigned ticket; only one write sticks.
    let lost = TicketRepo::claim(&mut conn, ticket.id, tech_b).await.unwrap();
    assert!(lost.is_none());

    let current = TicketRepo::find_by_id(&pool, ticket.id).await.unwrap().unwrap();
    assert_eq!(current.assigned_tech_id, Some(tech_a));
}

#[sqlx::test]
async fn reassignment_overwrites_but_closed_is_terminal(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let tech_a = seed_user(&pool, "Budi", "budi@example.com", ActorRole::Technician).await;
    let tech_b = seed_user(&pool, "Sari", "sari@example.com", ActorRole::Technician).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();
    TicketRepo::claim(&mut conn, ticket.id, tech_a).await.unwrap().unwrap();

    // The admin path may overwrite an existing assignee.
    let reassigned = TicketRepo::set_assignee(&mut conn, ticket.id, tech_b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reassigned.assigned_tech_id, Some(tech_b));

    force_status(&pool, ticket.id, TicketStatus::Closed).await;
    assert!(TicketRepo::set_assignee(&mut conn, ticket.id, tech_a)
        .await
        .unwrap()
        .is_none());
    assert!(TicketRepo::claim(&mut conn, ticket.id, tech_a)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Write-once columns
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn sla_flags_keep_their_first_evaluation(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let tech = seed_user(&pool, "Budi", "budi@example.com", ActorRole::Technician).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();
    TicketRepo::update_status(
        &mut conn,
        ticket.id,
        TicketStatus::Open,
        TicketStatus::InProgress,
        None,
        Some(true),
        None,
        Some(tech),
    )
    .await
    .unwrap()
    .unwrap();

    // A later transition passes a contradictory value; COALESCE must keep
    // the first one.
    let updated = TicketRepo::update_status(
        &mut conn,
        ticket.id,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        Some("Reseated the RAM"),
        Some(false),
        Some(true),
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.sla_response_met, Some(true));
    assert_eq!(updated.sla_resolution_met, Some(true));
    assert_eq!(updated.resolution.as_deref(), Some("Reseated the RAM"));
}

#[sqlx::test]
async fn rating_applies_once_and_only_when_closed(pool: PgPool) {
    let requester = seed_user(&pool, "Rina", "rina@example.com", ActorRole::Requester).await;
    let ticket = seed_ticket(&pool, requester).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(TicketRepo::set_rating(&mut conn, ticket.id, 4)
        .await
        .unwrap()
        .is_none());

    force_status(&pool, ticket.id, TicketStatus::Closed).await;
    let rated = TicketRepo::set_rating(&mut conn, ticket.id, 4).await.unwrap().unwrap();
    assert_eq!(rated.rating, Some(4));

    assert!(TicketRepo::set_rating(&mut conn, ticket.id, 5)
        .await
        .unwrap()
        .is_none());
    let current = TicketRepo::find_by_id(&pool, ticket.id).await.unwrap().unwrap();
    assert_eq!(current.rating, Some(4));
}
