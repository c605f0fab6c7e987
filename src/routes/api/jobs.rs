use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::job::{Job, JobFilters, JobWithCompany};
use crate::models::match_record::MatchRecord;

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}

pub async fn list(
    State(pool): State<PgPool>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<JobListResponse>, AppError> {
    let page = filters.page.unwrap_or(1).max(1);
    let page_size = filters.page_size.unwrap_or(25).clamp(1, 100);

    let jobs = Job::list(&pool, &filters).await?;
    let total = Job::count(&pool, &filters).await?;
    let has_more = page * page_size < total;

    Ok(Json(JobListResponse { jobs, total, page, page_size, has_more }))
}

pub async fn get(State(pool): State<PgPool>, Path(id): Path<i32>) -> Result<Json<JobWithCompany>, AppError> {
    let job = Job::get_with_company(&pool, id).await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ClickQuery {
    pub candidate_id: i32,
}

pub async fn click(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    Query(query): Query<ClickQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = MatchRecord::find(&pool, query.candidate_id, id).await?;
    MatchRecord::mark_clicked(&pool, record.id).await?;
    Ok(Json(serde_json::json!({ "clicked": true })))
}
