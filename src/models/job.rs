use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: i32,
    pub company_id: i32,
    pub raw_job_id: Option<i32>,
    pub source_url: String,
    pub title: String,
    pub role_family: String,
    pub role_specialization: Option<String>,
    pub seniority: Option<String>,
    pub location_type: Option<String>,
    pub locations: Vec<String>,
    pub skills: Vec<String>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub employment_type: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub freshness_score: f32,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub is_active: bool,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub delisted_at: Option<DateTime<Utc>>,
    pub delist_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized fields produced by the normalizer stage, ready to persist.
#[derive(Debug, Default)]
pub struct NormalizedJob {
    pub title: String,
    pub role_family: String,
    pub role_specialization: Option<String>,
    pub seniority: Option<String>,
    pub location_type: Option<String>,
    pub locations: Vec<String>,
    pub skills: Vec<String>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub employment_type: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub freshness_score: f32,
}

/// A job paired with the company that posted it, for the single-job
/// detail endpoint.
#[derive(Debug, Serialize)]
pub struct JobWithCompany {
    #[serde(flatten)]
    pub job: Job,
    pub company_name: String,
    pub company_domain: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JobFilters {
    pub role_family: Option<String>,
    pub seniority: Option<String>,
    pub location_type: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Job {
    /// Upsert keyed on `(company_id, source_url)`; the embedder sets
    /// `embedding` separately once the text is vectorized.
    pub async fn upsert(
        pool: &PgPool,
        company_id: i32,
        raw_job_id: Option<i32>,
        source_url: &str,
        normalized: NormalizedJob,
    ) -> Result<Job, AppError> {
        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (company_id, raw_job_id, source_url, title, role_family, role_specialization, seniority, location_type, locations, skills, min_salary, max_salary, employment_type, posted_at, freshness_score)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             ON CONFLICT (company_id, source_url) DO UPDATE SET
                 raw_job_id = EXCLUDED.raw_job_id,
                 title = EXCLUDED.title,
                 role_family = EXCLUDED.role_family,
                 role_specialization = EXCLUDED.role_specialization,
                 seniority = EXCLUDED.seniority,
                 location_type = EXCLUDED.location_type,
                 locations = EXCLUDED.locations,
                 skills = EXCLUDED.skills,
                 min_salary = EXCLUDED.min_salary,
                 max_salary = EXCLUDED.max_salary,
                 employment_type = EXCLUDED.employment_type,
                 posted_at = EXCLUDED.posted_at,
                 freshness_score = EXCLUDED.freshness_score,
                 is_active = TRUE,
                 delisted_at = NULL,
                 delist_reason = NULL,
                 last_verified_at = NOW(),
                 updated_at = NOW()
             RETURNING *",
        )
        .bind(company_id)
        .bind(raw_job_id)
        .bind(source_url)
        .bind(&normalized.title)
        .bind(&normalized.role_family)
        .bind(&normalized.role_specialization)
        .bind(&normalized.seniority)
        .bind(&normalized.location_type)
        .bind(&normalized.locations)
        .bind(&normalized.skills)
        .bind(normalized.min_salary)
        .bind(normalized.max_salary)
        .bind(&normalized.employment_type)
        .bind(normalized.posted_at)
        .bind(normalized.freshness_score)
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Job, AppError> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }

    pub async fn get_with_company(pool: &PgPool, id: i32) -> Result<JobWithCompany, AppError> {
        let job = Self::get(pool, id).await?;
        let company: (String, Option<String>) =
            sqlx::query_as("SELECT name, domain FROM companies WHERE id = $1")
                .bind(job.company_id)
                .fetch_one(pool)
                .await?;
        Ok(JobWithCompany { job, company_name: company.0, company_domain: company.1 })
    }

    pub async fn list(pool: &PgPool, filters: &JobFilters) -> Result<Vec<Job>, AppError> {
        let page = filters.page.unwrap_or(1).max(1);
        let page_size = filters.page_size.unwrap_or(25).clamp(1, 100);
        let offset = (page - 1) * page_size;

        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE is_active
             AND ($1::text IS NULL OR role_family = $1)
             AND ($2::text IS NULL OR seniority = $2)
             AND ($3::text IS NULL OR location_type = $3)
             ORDER BY freshness_score DESC, posted_at DESC NULLS LAST
             LIMIT $4 OFFSET $5",
        )
        .bind(&filters.role_family)
        .bind(&filters.seniority)
        .bind(&filters.location_type)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    /// Total active jobs matching `filters`, for pagination's `has_more`.
    pub async fn count(pool: &PgPool, filters: &JobFilters) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE is_active
             AND ($1::text IS NULL OR role_family = $1)
             AND ($2::text IS NULL OR seniority = $2)
             AND ($3::text IS NULL OR location_type = $3)",
        )
        .bind(&filters.role_family)
        .bind(&filters.seniority)
        .bind(&filters.location_type)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn set_embedding(pool: &PgPool, id: i32, embedding: Vector) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET embedding = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(embedding)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active jobs for one company, the maintenance stage's basis for
    /// diffing a fresh listing against what's currently on record.
    pub async fn active_for_company(pool: &PgPool, company_id: i32) -> Result<Vec<Job>, AppError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE company_id = $1 AND is_active ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    pub async fn missing_embedding(pool: &PgPool, limit: i64) -> Result<Vec<Job>, AppError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE is_active AND embedding IS NULL ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    /// Active jobs whose `last_verified_at` is older than `refresh_days`,
    /// the maintenance stage's re-verification candidate set.
    pub async fn due_for_verification(
        pool: &PgPool,
        refresh_days: i64,
    ) -> Result<Vec<Job>, AppError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE is_active
             AND (last_verified_at IS NULL OR last_verified_at < NOW() - ($1 || ' days')::interval)
             ORDER BY last_verified_at NULLS FIRST",
        )
        .bind(refresh_days.to_string())
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    pub async fn mark_verified(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET last_verified_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delist(pool: &PgPool, id: i32, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE jobs SET is_active = FALSE, delisted_at = NOW(), delist_reason = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delist_all_for_company(
        pool: &PgPool,
        company_id: i32,
        reason: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE jobs SET is_active = FALSE, delisted_at = NOW(), delist_reason = $2, updated_at = NOW()
             WHERE company_id = $1 AND is_active",
        )
        .bind(company_id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_filters_default_to_unrestricted() {
        let filters = JobFilters::default();
        assert!(filters.role_family.is_none());
        assert!(filters.page.is_none());
    }
}
