//! Integration tests for the outbound mail queue.

use sqlx::PgPool;

use opsdesk_db::repositories::MailRepo;

async fn enqueue(pool: &PgPool, subject: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    MailRepo::enqueue(
        &mut conn,
        &["ops@example.com".to_string()],
        subject,
        "body",
    )
    .await
    .unwrap()
}

#[sqlx::test]
async fn unsent_listing_is_oldest_first_and_capped(pool: PgPool) {
    let first = enqueue(&pool, "first").await;
    let second = enqueue(&pool, "second").await;
    enqueue(&pool, "third").await;

    let batch = MailRepo::list_unsent(&pool, 2).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(batch.iter().all(|m| m.sent_at.is_none()));
}

#[sqlx::test]
async fn mark_sent_stamps_exactly_once(pool: PgPool) {
    let id = enqueue(&pool, "renewal reminder").await;

    assert!(MailRepo::mark_sent(&pool, id).await.unwrap());
    // A second drain pass sees nothing to do for this row.
    assert!(!MailRepo::mark_sent(&pool, id).await.unwrap());

    let remaining = MailRepo::list_unsent(&pool, 10).await.unwrap();
    assert!(remaining.iter().all(|m| m.id != id));
}
