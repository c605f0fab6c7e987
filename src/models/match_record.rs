use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: i32,
    pub candidate_id: i32,
    pub job_id: i32,
    pub score: f32,
    pub hard_match: bool,
    pub match_reasons: Value,
    pub shown_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Upsert keyed on `(candidate_id, job_id)`; engagement timestamps
    /// (`shown_at`/`clicked_at`/...) survive a rescore untouched.
    pub async fn upsert(
        pool: &PgPool,
        candidate_id: i32,
        job_id: i32,
        score: f32,
        hard_match: bool,
        match_reasons: Value,
    ) -> Result<MatchRecord, AppError> {
        let record = sqlx::query_as::<_, MatchRecord>(
            "INSERT INTO matches (candidate_id, job_id, score, hard_match, match_reasons)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (candidate_id, job_id) DO UPDATE SET
                 score = EXCLUDED.score,
                 hard_match = EXCLUDED.hard_match,
                 match_reasons = EXCLUDED.match_reasons,
                 updated_at = NOW()
             RETURNING *",
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(score)
        .bind(hard_match)
        .bind(match_reasons)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    pub async fn for_candidate(
        pool: &PgPool,
        candidate_id: i32,
    ) -> Result<Vec<MatchRecord>, AppError> {
        let records = sqlx::query_as::<_, MatchRecord>(
            "SELECT * FROM matches WHERE candidate_id = $1 ORDER BY score DESC",
        )
        .bind(candidate_id)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    pub async fn find(pool: &PgPool, candidate_id: i32, job_id: i32) -> Result<MatchRecord, AppError> {
        sqlx::query_as::<_, MatchRecord>("SELECT * FROM matches WHERE candidate_id = $1 AND job_id = $2")
            .bind(candidate_id)
            .bind(job_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No match between candidate {candidate_id} and job {job_id}")))
    }

    pub async fn mark_clicked(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE matches SET clicked_at = COALESCE(clicked_at, NOW()), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Paginated matches for a candidate at or above `min_score`, newest
    /// score first. Returns `(rows, total)`.
    pub async fn for_candidate_paginated(
        pool: &PgPool,
        candidate_id: i32,
        min_score: f32,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<MatchRecord>, i64), AppError> {
        let offset = (page - 1).max(0) * page_size;
        let rows = sqlx::query_as::<_, MatchRecord>(
            "SELECT * FROM matches WHERE candidate_id = $1 AND score >= $2
             ORDER BY score DESC LIMIT $3 OFFSET $4",
        )
        .bind(candidate_id)
        .bind(min_score)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM matches WHERE candidate_id = $1 AND score >= $2",
        )
        .bind(candidate_id)
        .bind(min_score)
        .fetch_one(pool)
        .await?;

        Ok((rows, total.0))
    }

    pub async fn mark_shown(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE matches SET shown_at = COALESCE(shown_at, NOW()), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_dismissed(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE matches SET dismissed_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
