use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DiscoveryQueueEntry {
    pub id: i32,
    pub dedupe_key: String,
    pub name: String,
    pub domain: Option<String>,
    pub careers_url: Option<String>,
    pub website_url: Option<String>,
    pub source: String,
    pub metadata: Value,
    pub status: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct DiscoveredCandidate {
    pub dedupe_key: String,
    pub name: String,
    pub domain: Option<String>,
    pub careers_url: Option<String>,
    pub website_url: Option<String>,
    pub source: String,
    pub metadata: Value,
}

const MAX_RETRIES: i32 = 3;

impl DiscoveryQueueEntry {
    /// Inserts a newly discovered company, or merges incoming metadata into
    /// an existing `pending` row with the same dedupe key. A row already
    /// past `pending` is left untouched — discovery never reopens work the
    /// queue has already claimed or resolved.
    pub async fn enqueue(pool: &PgPool, candidate: DiscoveredCandidate) -> Result<DiscoveryQueueEntry, AppError> {
        let entry = sqlx::query_as::<_, DiscoveryQueueEntry>(
            "INSERT INTO discovery_queue (dedupe_key, name, domain, careers_url, website_url, source, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (dedupe_key) DO UPDATE SET
                 careers_url = COALESCE(discovery_queue.careers_url, EXCLUDED.careers_url),
                 website_url = COALESCE(discovery_queue.website_url, EXCLUDED.website_url),
                 metadata = discovery_queue.metadata || EXCLUDED.metadata,
                 updated_at = NOW()
             WHERE discovery_queue.status = 'pending'
             RETURNING *",
        )
        .bind(&candidate.dedupe_key)
        .bind(&candidate.name)
        .bind(&candidate.domain)
        .bind(&candidate.careers_url)
        .bind(&candidate.website_url)
        .bind(&candidate.source)
        .bind(&candidate.metadata)
        .fetch_optional(pool)
        .await?;

        match entry {
            Some(entry) => Ok(entry),
            None => {
                sqlx::query_as::<_, DiscoveryQueueEntry>(
                    "SELECT * FROM discovery_queue WHERE dedupe_key = $1",
                )
                .bind(&candidate.dedupe_key)
                .fetch_one(pool)
                .await
                .map_err(AppError::from)
            }
        }
    }

    /// Atomically claims the oldest pending entry for processing.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<DiscoveryQueueEntry>, AppError> {
        let mut tx = pool.begin().await?;
        let entry = sqlx::query_as::<_, DiscoveryQueueEntry>(
            "SELECT * FROM discovery_queue WHERE status = 'pending' ORDER BY created_at
             FOR UPDATE SKIP LOCKED LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entry) = entry else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE discovery_queue SET status = 'processing', updated_at = NOW() WHERE id = $1")
            .bind(entry.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(entry))
    }

    pub async fn mark_completed(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE discovery_queue SET status = 'completed', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_skipped(pool: &PgPool, id: i32, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE discovery_queue SET status = 'skipped', last_error = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Retries up to `MAX_RETRIES`, then hands the entry to manual review.
    pub async fn mark_failed(pool: &PgPool, id: i32, error: &str) -> Result<(), AppError> {
        let row: (i32,) = sqlx::query_as(
            "UPDATE discovery_queue SET retry_count = retry_count + 1, last_error = $2, updated_at = NOW()
             WHERE id = $1 RETURNING retry_count",
        )
        .bind(id)
        .bind(error)
        .fetch_one(pool)
        .await?;

        let status = if row.0 >= MAX_RETRIES { "review" } else { "pending" };
        sqlx::query("UPDATE discovery_queue SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn pending_count(pool: &PgPool) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM discovery_queue WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_retries_before_review() {
        assert_eq!(MAX_RETRIES, 3);
    }
}
