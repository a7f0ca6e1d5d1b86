//! Repository for the `audit_trails` table.
//!
//! Append-only: `append` is the single write operation; no update or delete
//! exists. `append` takes a connection so it joins the caller's transaction
//! — an entity can never change status without its log entry committing,
//! and no orphan entry can claim a change that did not persist.

use sqlx::{PgConnection, PgPool};

use opsdesk_core::types::{DbId, Timestamp};

use crate::models::audit::{AuditEntry, AuditQuery, NewAuditEntry};

/// Column list for `audit_trails` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, action, action_by, action_by_name, \
    details, changes, timestamp";

/// Provides append and query operations for the audit trail.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one entry. The only write this table ever sees.
    pub async fn append(
        conn: &mut PgConnection,
        entry: &NewAuditEntry,
    ) -> Result<AuditEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_trails \
             (entity_type, entity_id, action, action_by, action_by_name, details, changes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.action)
            .bind(entry.action_by)
            .bind(&entry.action_by_name)
            .bind(&entry.details)
            .bind(&entry.changes)
            .fetch_one(conn)
            .await
    }

    /// One entity's history, newest first. Ties on `timestamp` are broken
    /// by insertion order.
    pub async fn timeline(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_trails \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY timestamp DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Query the trail with filtering and pagination.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0);

        let (where_clause, bind_values, bind_idx) = build_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_trails {where_clause} \
             ORDER BY timestamp DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditEntry>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count entries matching the given filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT FROM audit_trails {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit queries.
enum BindValue {
    BigInt(DbId),
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. The clause is
/// empty if no filters are active, or starts with `WHERE `.
fn build_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(ref entity_type) = params.entity_type {
        conditions.push(format!("entity_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(entity_type.clone()));
    }

    if let Some(entity_id) = params.entity_id {
        conditions.push(format!("entity_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(entity_id));
    }

    if let Some(ref action) = params.action {
        conditions.push(format!("action = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(action.clone()));
    }

    if let Some(from) = params.from {
        conditions.push(format!("timestamp >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = params.to {
        conditions.push(format!("timestamp <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_builds_no_where_clause() {
        let (clause, binds, idx) = build_filter(&AuditQuery::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
        assert_eq!(idx, 1);
    }

    #[test]
    fn entity_filter_builds_indexed_placeholders() {
        let params = AuditQuery {
            entity_type: Some("ticket".into()),
            entity_id: Some(42),
            ..Default::default()
        };
        let (clause, binds, idx) = build_filter(&params);
        assert_eq!(clause, "WHERE entity_type = $1 AND entity_id = $2");
        assert_eq!(binds.len(), 2);
        assert_eq!(idx, 3);
    }
}
