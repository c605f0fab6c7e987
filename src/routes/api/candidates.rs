use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;
use crate::matcher;
use crate::models::candidate::{CandidateProfile, UpdateCandidate, UpsertCandidate};
use crate::models::match_record::MatchRecord;

pub async fn get(State(pool): State<PgPool>, Path(id): Path<i32>) -> Result<Json<CandidateProfile>, AppError> {
    let candidate = CandidateProfile::get(&pool, id).await?;
    Ok(Json(candidate))
}

pub async fn update(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateCandidate>,
) -> Result<Json<CandidateProfile>, AppError> {
    let candidate = CandidateProfile::update(&pool, id, input).await?;
    Ok(Json(candidate))
}

pub async fn sync_from_waitlist(
    State(pool): State<PgPool>,
    Json(input): Json<UpsertCandidate>,
) -> Result<Json<CandidateProfile>, AppError> {
    let candidate = CandidateProfile::upsert(&pool, input).await?;
    Ok(Json(candidate))
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub min_score: Option<f32>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchRecord>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
    pub no_matches_reason: Option<&'static str>,
}

/// Returns this candidate's persisted matches. When none are on record yet
/// and the candidate has an embedding, runs the matcher inline before
/// answering so a fresh sign-up doesn't see an empty page until the next
/// scheduled pass.
pub async fn matches(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<MatchesResponse>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(25).clamp(1, 100);
    let min_score = query.min_score.unwrap_or(0.0);

    let (mut rows, mut total) = MatchRecord::for_candidate_paginated(&pool, id, min_score, page, page_size).await?;

    let mut no_matches_reason = None;
    if rows.is_empty() && total == 0 {
        let candidate = CandidateProfile::get(&pool, id).await?;
        let outcome = matcher::match_candidate(&pool, &candidate).await?;
        if outcome.matched.is_empty() {
            no_matches_reason = outcome.no_match_reason.map(|r| r.as_str());
        } else {
            let refetched = MatchRecord::for_candidate_paginated(&pool, id, min_score, page, page_size).await?;
            rows = refetched.0;
            total = refetched.1;
        }
    }

    let has_more = page * page_size < total;
    Ok(Json(MatchesResponse { matches: rows, total, page, page_size, has_more, no_matches_reason }))
}
