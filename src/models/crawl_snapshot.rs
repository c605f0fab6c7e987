use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CrawlSnapshot {
    pub id: i64,
    pub company_id: i32,
    pub url: String,
    pub crawled_at: DateTime<Utc>,
    pub html_content: Option<String>,
    pub html_hash: String,
    pub status_code: i16,
    pub rendered: bool,
}

impl CrawlSnapshot {
    pub async fn insert(
        pool: &PgPool,
        company_id: i32,
        url: &str,
        html_content: Option<&str>,
        html_hash: &str,
        status_code: i16,
        rendered: bool,
    ) -> Result<CrawlSnapshot, AppError> {
        let snapshot = sqlx::query_as::<_, CrawlSnapshot>(
            "INSERT INTO crawl_snapshots (company_id, url, html_content, html_hash, status_code, rendered)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(company_id)
        .bind(url)
        .bind(html_content)
        .bind(html_hash)
        .bind(status_code)
        .bind(rendered)
        .fetch_one(pool)
        .await?;
        Ok(snapshot)
    }

    /// Most recent snapshot for a URL, used to decide whether content changed
    /// since the last crawl before re-extracting.
    pub async fn latest_for_url(
        pool: &PgPool,
        company_id: i32,
        url: &str,
    ) -> Result<Option<CrawlSnapshot>, AppError> {
        let snapshot = sqlx::query_as::<_, CrawlSnapshot>(
            "SELECT * FROM crawl_snapshots WHERE company_id = $1 AND url = $2 ORDER BY crawled_at DESC LIMIT 1",
        )
        .bind(company_id)
        .bind(url)
        .fetch_optional(pool)
        .await?;
        Ok(snapshot)
    }
}
