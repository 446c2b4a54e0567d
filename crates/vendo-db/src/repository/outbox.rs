//! # Event Outbox Repository
//!
//! Durable queue of announced sale events.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern                                       │
//! │                                                                         │
//! │  Sale workflow announces SaleCreated                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO event_outbox (event_type, aggregate_id, payload)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            RELAY (vendo-service OutboxRelay)                    │   │
//! │  │                                                                 │   │
//! │  │  1. get_pending(limit)         oldest first                     │   │
//! │  │  2. deliver each payload                                        │   │
//! │  │     a. ok   → mark_delivered(id)                                │   │
//! │  │     b. fail → mark_failed(id, error), attempts += 1             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Events survive restarts; delivery is at-least-once.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use vendo_core::SaleEvent;

/// A row of the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: i64,
    /// `SaleEvent::event_type()` of the payload.
    pub event_type: String,
    /// Sale id the event is about.
    pub aggregate_id: i64,
    /// JSON serialization of the event.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Decodes the payload back into the event.
    pub fn event(&self) -> DbResult<SaleEvent> {
        serde_json::from_str(&self.payload).map_err(|e| DbError::invalid_data("event_outbox.payload", e))
    }
}

/// Repository for the event outbox.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Records an event for delivery.
    pub async fn enqueue(&self, event: &SaleEvent) -> DbResult<OutboxEntry> {
        let payload =
            serde_json::to_string(event).map_err(|e| DbError::invalid_data("event_outbox.payload", e))?;
        let now = Utc::now();

        debug!(
            event_type = %event.event_type(),
            sale_id = event.sale_id(),
            "Queuing event"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO event_outbox (event_type, aggregate_id, payload, attempts, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(event.event_type())
        .bind(event.sale_id())
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(OutboxEntry {
            id: result.last_insert_rowid(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.sale_id(),
            payload,
            attempts: 0,
            last_error: None,
            created_at: now,
            delivered_at: None,
        })
    }

    /// Undelivered entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries: Vec<OutboxEntry> = sqlx::query_as(
            r#"
            SELECT id, event_type, aggregate_id, payload, attempts, last_error,
                   created_at, delivered_at
            FROM event_outbox
            WHERE delivered_at IS NULL
            ORDER BY id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered.
    pub async fn mark_delivered(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE event_outbox SET delivered_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }
        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: i64, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE event_outbox SET
                attempts = attempts + 1,
                last_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }
        Ok(())
    }

    /// Counts undelivered entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_outbox WHERE delivered_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes delivered entries older than `days_old` days.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_delivered(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM event_outbox WHERE delivered_at IS NOT NULL AND delivered_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::fixture;
    use vendo_core::Money;

    fn event(sale_id: i64) -> SaleEvent {
        SaleEvent::SaleModified {
            sale_id,
            total_amount: Money::whole(50),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_deliver() {
        let fx = fixture().await;
        let outbox = fx.db.outbox();

        let first = outbox.enqueue(&event(1)).await.unwrap();
        outbox.enqueue(&event(2)).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        let pending = outbox.get_pending(10).await.unwrap();
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[0].event_type, "sale_modified");
        assert_eq!(pending[0].event().unwrap().sale_id(), 1);

        outbox.mark_delivered(first.id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        // Fresh deliveries are kept
        assert_eq!(outbox.cleanup_delivered(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_failed_counts_attempts() {
        let fx = fixture().await;
        let outbox = fx.db.outbox();
        let entry = outbox.enqueue(&event(3)).await.unwrap();

        outbox.mark_failed(entry.id, "relay offline").await.unwrap();
        outbox.mark_failed(entry.id, "relay offline").await.unwrap();

        let pending = outbox.get_pending(1).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("relay offline"));
        assert!(outbox.mark_delivered(999).await.is_err());
    }
}
