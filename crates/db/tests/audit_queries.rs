//! Integration tests for audit trail appends and the dynamically-built
//! filter queries.

use sqlx::PgPool;

use opsdesk_core::audit::{actions, change_set, entity_types, SYSTEM_ACTOR_NAME};
use opsdesk_db::models::audit::{AuditQuery, NewAuditEntry};
use opsdesk_db::repositories::AuditRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn append(
    pool: &PgPool,
    entity_type: &'static str,
    entity_id: i64,
    action: &'static str,
    details: &str,
) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    AuditRepo::append(
        &mut conn,
        &NewAuditEntry {
            entity_type,
            entity_id,
            action,
            action_by: None,
            action_by_name: SYSTEM_ACTOR_NAME.to_string(),
            details: details.to_string(),
            changes: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn entity_filters_narrow_query_and_count_together(pool: PgPool) {
    append(&pool, entity_types::TICKET, 1, actions::STATUS_CHANGE, "open to in_progress").await;
    append(&pool, entity_types::TICKET, 2, actions::STATUS_CHANGE, "open to in_progress").await;
    append(&pool, entity_types::SUBSCRIPTION, 1, actions::SUBSCRIPTION_EXPIRE, "expired").await;

    let params = AuditQuery {
        entity_type: Some(entity_types::TICKET.to_string()),
        ..Default::default()
    };
    let entries = AuditRepo::query(&pool, &params).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.entity_type == entity_types::TICKET));
    assert_eq!(AuditRepo::count(&pool, &params).await.unwrap(), 2);

    let params = AuditQuery {
        entity_type: Some(entity_types::TICKET.to_string()),
        entity_id: Some(2),
        action: Some(actions::STATUS_CHANGE.to_string()),
        ..Default::default()
    };
    let entries = AuditRepo::query(&pool, &params).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_id, 2);
    assert_eq!(AuditRepo::count(&pool, &params).await.unwrap(), 1);
}

#[sqlx::test]
async fn time_window_and_pagination_filters_apply(pool: PgPool) {
    for i in 0..3 {
        append(&pool, entity_types::TICKET, 7, actions::STATUS_CHANGE, &format!("step {i}")).await;
    }

    // Everything so far sits inside a generous window.
    let params = AuditQuery {
        from: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        to: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        ..Default::default()
    };
    assert_eq!(AuditRepo::count(&pool, &params).await.unwrap(), 3);

    // A window entirely in the past matches nothing.
    let params = AuditQuery {
        to: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        ..Default::default()
    };
    assert_eq!(AuditRepo::query(&pool, &params).await.unwrap().len(), 0);

    // Newest first, one page of one, skipping the newest.
    let params = AuditQuery {
        limit: Some(1),
        offset: Some(1),
        ..Default::default()
    };
    let page = AuditRepo::query(&pool, &params).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].details, "step 1");
}

#[sqlx::test]
async fn timeline_returns_newest_first_with_changes_intact(pool: PgPool) {
    let first = append(&pool, entity_types::TICKET, 9, actions::TICKET_CREATE, "created").await;
    let mut conn = pool.acquire().await.unwrap();
    let second = AuditRepo::append(
        &mut conn,
        &NewAuditEntry {
            entity_type: entity_types::TICKET,
            entity_id: 9,
            action: actions::STATUS_CHANGE,
            action_by: None,
            action_by_name: SYSTEM_ACTOR_NAME.to_string(),
            details: "open to in_progress".to_string(),
            changes: Some(change_set(&[("status", "open", "in_progress")])),
        },
    )
    .await
    .unwrap()
    .id;

    let timeline = AuditRepo::timeline(&pool, entity_types::TICKET, 9, 10).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].id, second);
    assert_eq!(timeline[1].id, first);
    assert_eq!(
        timeline[0].changes.as_ref().unwrap()["status"]["new"],
        "in_progress"
    );

    let capped = AuditRepo::timeline(&pool, entity_types::TICKET, 9, 1).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, second);
}
