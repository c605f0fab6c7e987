use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AtsType {
    Greenhouse,
    Lever,
    Ashby,
    Workday,
    Custom,
    Unknown,
}

impl AtsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AtsType::Greenhouse => "greenhouse",
            AtsType::Lever => "lever",
            AtsType::Ashby => "ashby",
            AtsType::Workday => "workday",
            AtsType::Custom => "custom",
            AtsType::Unknown => "unknown",
        }
    }

    pub fn requires_identifier(&self) -> bool {
        matches!(
            self,
            AtsType::Greenhouse | AtsType::Lever | AtsType::Ashby | AtsType::Workday
        )
    }

    pub fn parse(raw: &str) -> AtsType {
        match raw {
            "greenhouse" => AtsType::Greenhouse,
            "lever" => AtsType::Lever,
            "ashby" => AtsType::Ashby,
            "workday" => AtsType::Workday,
            "custom" => AtsType::Custom,
            _ => AtsType::Unknown,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub domain: Option<String>,
    pub careers_url: Option<String>,
    pub website_url: Option<String>,
    pub ats_type: String,
    pub ats_identifier: Option<String>,
    pub crawl_priority: i16,
    pub is_active: bool,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub crawl_attempts: i32,
    pub not_found_streak: i32,
    pub discovery_source: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<i32>,
    pub funding_stage: Option<String>,
    pub discovery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub domain: Option<String>,
    pub careers_url: Option<String>,
    pub website_url: Option<String>,
    pub discovery_source: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<i32>,
    pub funding_stage: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompanyFilters {
    pub is_active: Option<bool>,
    pub ats_type: Option<String>,
}

impl Company {
    pub async fn list(pool: &PgPool, filters: &CompanyFilters) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE ($1::bool IS NULL OR is_active = $1) AND ($2::text IS NULL OR ats_type = $2) ORDER BY crawl_priority DESC, name",
        )
        .bind(filters.is_active)
        .bind(&filters.ats_type)
        .fetch_all(pool)
        .await?;
        Ok(companies)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))
    }

    /// Resolve a discovered company into a row: match by normalized domain
    /// first, then by name, otherwise insert a new one with `ats_type`
    /// left as `unknown` until the detector runs.
    pub async fn find_or_create(pool: &PgPool, input: CreateCompany) -> Result<Company, AppError> {
        if let Some(domain) = &input.domain {
            if let Some(existing) =
                sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE domain = $1")
                    .bind(domain)
                    .fetch_optional(pool)
                    .await?
            {
                return Ok(existing);
            }
        }

        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name, domain, careers_url, website_url, discovery_source, country, industry, employee_count, funding_stage)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(&input.name)
        .bind(&input.domain)
        .bind(&input.careers_url)
        .bind(&input.website_url)
        .bind(&input.discovery_source)
        .bind(&input.country)
        .bind(&input.industry)
        .bind(input.employee_count)
        .bind(&input.funding_stage)
        .fetch_one(pool)
        .await?;
        Ok(company)
    }

    /// Sole writer of the four ATS fields, called by the detector.
    /// Idempotent: writing the same inputs twice leaves the row unchanged
    /// apart from `updated_at`.
    pub async fn set_ats(
        pool: &PgPool,
        id: i32,
        ats_type: AtsType,
        ats_identifier: Option<&str>,
        careers_url: Option<&str>,
    ) -> Result<Company, AppError> {
        if ats_type.requires_identifier() && ats_identifier.unwrap_or("").is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "{} requires a non-empty ats_identifier",
                ats_type.as_str()
            )));
        }
        let company = sqlx::query_as::<_, Company>(
            "UPDATE companies SET ats_type = $2, ats_identifier = $3, careers_url = COALESCE($4, careers_url), updated_at = NOW()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ats_type.as_str())
        .bind(ats_identifier)
        .bind(careers_url)
        .fetch_one(pool)
        .await?;
        Ok(company)
    }

    pub async fn record_crawl(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE companies SET last_crawled_at = NOW(), crawl_attempts = crawl_attempts + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn record_maintenance(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE companies SET last_maintenance_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Companies whose maintenance is overdue by `refresh_days`.
    pub async fn due_for_maintenance(
        pool: &PgPool,
        refresh_days: i64,
    ) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE is_active AND ats_type <> 'unknown'
             AND (last_maintenance_at IS NULL OR last_maintenance_at < NOW() - ($1 || ' days')::interval)
             ORDER BY last_maintenance_at NULLS FIRST",
        )
        .bind(refresh_days.to_string())
        .fetch_all(pool)
        .await?;
        Ok(companies)
    }

    /// Two consecutive `not_found` careers-page responses deactivate the company.
    pub async fn record_not_found(pool: &PgPool, id: i32) -> Result<bool, AppError> {
        let row: (i32,) = sqlx::query_as(
            "UPDATE companies SET not_found_streak = not_found_streak + 1, updated_at = NOW() WHERE id = $1 RETURNING not_found_streak",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        if row.0 >= 2 {
            sqlx::query("UPDATE companies SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn reset_not_found_streak(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE companies SET not_found_streak = 0 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_identifier_matches_known_vendors() {
        assert!(AtsType::Greenhouse.requires_identifier());
        assert!(AtsType::Workday.requires_identifier());
        assert!(!AtsType::Custom.requires_identifier());
        assert!(!AtsType::Unknown.requires_identifier());
    }
}
