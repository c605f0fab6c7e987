use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RawJob {
    pub id: i32,
    pub company_id: i32,
    pub source_url: String,
    pub title_raw: Option<String>,
    pub description_raw: Option<String>,
    pub location_raw: Option<String>,
    pub salary_raw: Option<String>,
    pub employment_type_raw: Option<String>,
    pub posted_at_raw: Option<String>,
    pub raw_payload: Option<Value>,
    pub extracted_at: DateTime<Utc>,
    pub enrich_failed_at: Option<DateTime<Utc>>,
    pub canonical_job_id: Option<i32>,
}

#[derive(Debug, Default)]
pub struct RawJobFields {
    pub title_raw: Option<String>,
    pub description_raw: Option<String>,
    pub location_raw: Option<String>,
    pub salary_raw: Option<String>,
    pub employment_type_raw: Option<String>,
    pub posted_at_raw: Option<String>,
    pub raw_payload: Option<Value>,
}

impl RawJob {
    /// Upsert keyed on `(company_id, source_url)` — an extractor re-running
    /// over the same posting refreshes the row rather than duplicating it.
    pub async fn upsert(
        pool: &PgPool,
        company_id: i32,
        source_url: &str,
        fields: RawJobFields,
    ) -> Result<RawJob, AppError> {
        let raw = sqlx::query_as::<_, RawJob>(
            "INSERT INTO jobs_raw (company_id, source_url, title_raw, description_raw, location_raw, salary_raw, employment_type_raw, posted_at_raw, raw_payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (company_id, source_url) DO UPDATE SET
                 title_raw = EXCLUDED.title_raw,
                 description_raw = EXCLUDED.description_raw,
                 location_raw = EXCLUDED.location_raw,
                 salary_raw = EXCLUDED.salary_raw,
                 employment_type_raw = EXCLUDED.employment_type_raw,
                 posted_at_raw = EXCLUDED.posted_at_raw,
                 raw_payload = EXCLUDED.raw_payload,
                 extracted_at = NOW(),
                 enrich_failed_at = NULL
             RETURNING *",
        )
        .bind(company_id)
        .bind(source_url)
        .bind(fields.title_raw)
        .bind(fields.description_raw)
        .bind(fields.location_raw)
        .bind(fields.salary_raw)
        .bind(fields.employment_type_raw)
        .bind(fields.posted_at_raw)
        .bind(fields.raw_payload)
        .fetch_one(pool)
        .await?;
        Ok(raw)
    }

    pub async fn set_canonical_job(
        pool: &PgPool,
        id: i32,
        job_id: i32,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs_raw SET canonical_job_id = $2 WHERE id = $1")
            .bind(id)
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_description(pool: &PgPool, id: i32, description_raw: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE jobs_raw SET description_raw = $2, enrich_failed_at = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(description_raw)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_enrich_failed(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs_raw SET enrich_failed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Raw rows still missing a canonical job, excluding ones whose last
    /// enrichment attempt failed within `skip_window`. The window resets
    /// whenever a new full pipeline run starts (see orchestrator::pipeline).
    pub async fn pending_enrichment(
        pool: &PgPool,
        company_id: i32,
        skip_window_hours: i64,
    ) -> Result<Vec<RawJob>, AppError> {
        let rows = sqlx::query_as::<_, RawJob>(
            "SELECT * FROM jobs_raw WHERE company_id = $1 AND canonical_job_id IS NULL
             AND (enrich_failed_at IS NULL OR enrich_failed_at < NOW() - ($2 || ' hours')::interval)
             ORDER BY extracted_at",
        )
        .bind(company_id)
        .bind(skip_window_hours.to_string())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
