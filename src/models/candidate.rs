use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CandidateProfile {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role_families: Vec<String>,
    pub seniority: Option<String>,
    pub min_salary: Option<i32>,
    pub locations: Vec<String>,
    pub location_types: Vec<String>,
    pub role_types: Vec<String>,
    pub skills: Vec<String>,
    pub exclusions: Vec<String>,
    pub profile_text: Option<String>,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub last_matched_at: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertCandidate {
    pub email: String,
    pub name: Option<String>,
    pub role_families: Vec<String>,
    pub seniority: Option<String>,
    pub min_salary: Option<i32>,
    pub locations: Vec<String>,
    pub location_types: Vec<String>,
    pub role_types: Vec<String>,
    pub skills: Vec<String>,
    pub exclusions: Vec<String>,
    pub profile_text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCandidate {
    pub name: Option<String>,
    pub role_families: Option<Vec<String>>,
    pub seniority: Option<String>,
    pub min_salary: Option<i32>,
    pub locations: Option<Vec<String>>,
    pub location_types: Option<Vec<String>>,
    pub role_types: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    pub exclusions: Option<Vec<String>>,
    pub profile_text: Option<String>,
    pub is_active: Option<bool>,
}

impl CandidateProfile {
    pub async fn get(pool: &PgPool, id: i32) -> Result<CandidateProfile, AppError> {
        sqlx::query_as::<_, CandidateProfile>("SELECT * FROM candidate_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))
    }

    pub async fn list_active(pool: &PgPool) -> Result<Vec<CandidateProfile>, AppError> {
        let candidates = sqlx::query_as::<_, CandidateProfile>(
            "SELECT * FROM candidate_profiles WHERE is_active ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        Ok(candidates)
    }

    /// Intake from an external waitlist/signup source, keyed on email.
    /// Clears any stale embedding so the next embed pass regenerates it.
    pub async fn upsert(pool: &PgPool, input: UpsertCandidate) -> Result<CandidateProfile, AppError> {
        let candidate = sqlx::query_as::<_, CandidateProfile>(
            "INSERT INTO candidate_profiles (email, name, role_families, seniority, min_salary, locations, location_types, role_types, skills, exclusions, profile_text)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (email) DO UPDATE SET
                 name = EXCLUDED.name,
                 role_families = EXCLUDED.role_families,
                 seniority = EXCLUDED.seniority,
                 min_salary = EXCLUDED.min_salary,
                 locations = EXCLUDED.locations,
                 location_types = EXCLUDED.location_types,
                 role_types = EXCLUDED.role_types,
                 skills = EXCLUDED.skills,
                 exclusions = EXCLUDED.exclusions,
                 profile_text = EXCLUDED.profile_text,
                 embedding = NULL,
                 updated_at = NOW()
             RETURNING *",
        )
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.role_families)
        .bind(&input.seniority)
        .bind(input.min_salary)
        .bind(&input.locations)
        .bind(&input.location_types)
        .bind(&input.role_types)
        .bind(&input.skills)
        .bind(&input.exclusions)
        .bind(&input.profile_text)
        .fetch_one(pool)
        .await?;
        Ok(candidate)
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        input: UpdateCandidate,
    ) -> Result<CandidateProfile, AppError> {
        let existing = Self::get(pool, id).await?;
        let candidate = sqlx::query_as::<_, CandidateProfile>(
            "UPDATE candidate_profiles SET
                 name = $2, role_families = $3, seniority = $4, min_salary = $5,
                 locations = $6, location_types = $7, role_types = $8, skills = $9,
                 exclusions = $10, profile_text = $11, is_active = $12,
                 embedding = NULL, updated_at = NOW()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(input.name.or(existing.name))
        .bind(input.role_families.unwrap_or(existing.role_families))
        .bind(input.seniority.or(existing.seniority))
        .bind(input.min_salary.or(existing.min_salary))
        .bind(input.locations.unwrap_or(existing.locations))
        .bind(input.location_types.unwrap_or(existing.location_types))
        .bind(input.role_types.unwrap_or(existing.role_types))
        .bind(input.skills.unwrap_or(existing.skills))
        .bind(input.exclusions.unwrap_or(existing.exclusions))
        .bind(input.profile_text.or(existing.profile_text))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .fetch_one(pool)
        .await?;
        Ok(candidate)
    }

    pub async fn set_embedding(pool: &PgPool, id: i32, embedding: Vector) -> Result<(), AppError> {
        sqlx::query("UPDATE candidate_profiles SET embedding = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(embedding)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn missing_embedding(pool: &PgPool, limit: i64) -> Result<Vec<CandidateProfile>, AppError> {
        let candidates = sqlx::query_as::<_, CandidateProfile>(
            "SELECT * FROM candidate_profiles WHERE is_active AND embedding IS NULL ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(candidates)
    }

    pub async fn mark_matched(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE candidate_profiles SET last_matched_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
