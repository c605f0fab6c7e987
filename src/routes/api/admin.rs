use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discovery;
use crate::error::AppError;
use crate::models::company::AtsType;
use crate::models::discovery_queue::DiscoveryQueueEntry;
use crate::models::pipeline_run::PipelineRun;
use crate::orchestrator::pipeline::{self, PipelineFlags};
use crate::orchestrator::registry::FULL_PIPELINE;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PipelineStatus {
    pub running_run: Option<Value>,
    pub running_operations: Vec<String>,
    pub scheduler: crate::scheduler::SchedulerStatus,
    pub recent: Vec<Value>,
}

pub async fn pipeline_status(State(state): State<AppState>) -> Result<Json<PipelineStatus>, AppError> {
    let running_operations = state.registry.running_operations();
    let running_run = if state.registry.is_running(FULL_PIPELINE) {
        PipelineRun::recent(&state.pool, Some(FULL_PIPELINE), 1)
            .await?
            .into_iter()
            .next()
            .map(|r| r.summary_json())
    } else {
        None
    };
    let recent = PipelineRun::recent(&state.pool, None, 20)
        .await?
        .iter()
        .map(PipelineRun::summary_json)
        .collect();
    let scheduler = state.scheduler.status().await;

    Ok(Json(PipelineStatus { running_run, running_operations, scheduler, recent }))
}

pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(flags): Json<PipelineFlags>,
) -> Result<Json<Value>, AppError> {
    let run_id = pipeline::run_full_pipeline(&state.pool, &state.fetcher, &state.config, &state.registry, flags).await?;
    Ok(Json(serde_json::json!({ "run_id": run_id })))
}

#[derive(Debug, Deserialize)]
pub struct CrawlQuery {
    pub ats: Option<String>,
}

/// Crawls every ATS, or a single vendor when `?ats=` is given (e.g.
/// `?ats=greenhouse`), registered under its own `crawl_<vendor>` operation
/// type so a per-vendor run doesn't collide with a `crawl_all` in flight.
pub async fn run_crawl(State(state): State<AppState>, Query(query): Query<CrawlQuery>) -> Result<Json<Value>, AppError> {
    let (operation_type, ats_filter) = match query.ats.as_deref() {
        Some(ats) => {
            if matches!(AtsType::parse(ats), AtsType::Unknown) {
                return Err(AppError::BadRequest(format!("unknown ats type '{ats}'")));
            }
            (format!("crawl_{ats}"), Some(ats))
        }
        None => ("crawl_all".to_string(), None),
    };
    let (run_id, _cancel) = state.registry.start(&state.pool, &operation_type, false).await?;
    let result = pipeline::crawl_stage(&state.pool, &state.fetcher, &state.config, ats_filter).await;
    finish_stage(&state, &operation_type, result, run_id).await
}

pub async fn run_enrich(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let (run_id, _cancel) = state.registry.start(&state.pool, "enrich", false).await?;
    let result = pipeline::enrichment_stage(&state.pool, &state.fetcher).await;
    finish_stage(&state, "enrich", result, run_id).await
}

pub async fn run_embeddings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let (run_id, _cancel) = state.registry.start(&state.pool, "embeddings", false).await?;
    let embedder = crate::embedder::build_embedder(&state.config);
    let result = pipeline::embedding_stage(&state.pool, embedder.as_ref()).await;
    finish_stage(&state, "embeddings", result, run_id).await
}

async fn finish_stage(
    state: &AppState,
    operation_type: &str,
    result: Result<pipeline::StageCounts, AppError>,
    run_id: i32,
) -> Result<Json<Value>, AppError> {
    match result {
        Ok(counts) => {
            state
                .registry
                .finish(&state.pool, operation_type, crate::models::pipeline_run::RunStatus::Completed, None)
                .await?;
            Ok(Json(serde_json::json!({ "run_id": run_id, "processed": counts.processed, "failed": counts.failed })))
        }
        Err(err) => {
            state
                .registry
                .finish(&state.pool, operation_type, crate::models::pipeline_run::RunStatus::Failed, Some(&err.to_string()))
                .await?;
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscoveryRunInput {
    pub source_names: Option<Vec<String>>,
}

pub async fn run_discovery(
    State(state): State<AppState>,
    Json(input): Json<DiscoveryRunInput>,
) -> Result<Json<Value>, AppError> {
    let (run_id, _cancel) = state.registry.start(&state.pool, "discovery", false).await?;

    let mut processed = 0u32;
    let mut failed = 0u32;
    for source in discovery::enabled_sources(input.source_names.as_deref()) {
        match source.produce(50).await {
            Ok(companies) => {
                for company in companies {
                    match discovery::queue::enqueue(&state.pool, source.name(), company).await {
                        Ok(_) => processed += 1,
                        Err(_) => failed += 1,
                    }
                }
            }
            Err(_) => failed += 1,
        }
    }

    state
        .registry
        .finish(&state.pool, "discovery", crate::models::pipeline_run::RunStatus::Completed, None)
        .await?;

    Ok(Json(serde_json::json!({ "run_id": run_id, "enqueued": processed, "failed": failed })))
}

#[derive(Debug, Deserialize)]
pub struct ProcessQueueQuery {
    pub limit: Option<usize>,
}

pub async fn process_discovery_queue(
    State(state): State<AppState>,
    Query(query): Query<ProcessQueueQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.unwrap_or(50);
    let (processed, failed) = discovery::queue::process_queue(&state.pool, &state.fetcher, limit).await;
    let pending = DiscoveryQueueEntry::pending_count(&state.pool).await?;
    Ok(Json(serde_json::json!({ "processed": processed, "failed": failed, "pending": pending })))
}

#[derive(Debug, Deserialize)]
pub struct SchedulerStartQuery {
    pub interval_hours: Option<u64>,
}

pub async fn start_scheduler(
    State(state): State<AppState>,
    Query(query): Query<SchedulerStartQuery>,
) -> Result<Json<crate::scheduler::SchedulerStatus>, AppError> {
    state.scheduler.start(query.interval_hours).await;
    Ok(Json(state.scheduler.status().await))
}

pub async fn stop_scheduler(State(state): State<AppState>) -> Result<Json<crate::scheduler::SchedulerStatus>, AppError> {
    state.scheduler.stop().await;
    Ok(Json(state.scheduler.status().await))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub day: chrono::NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Analytics {
    pub jobs_ingested: Vec<DailyCount>,
    pub matches_created: Vec<DailyCount>,
}

pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Analytics>, AppError> {
    let days = query.days.unwrap_or(30).clamp(1, 365);

    let jobs_ingested = sqlx::query_as::<_, DailyCount>(
        "SELECT created_at::date AS day, COUNT(*) AS count FROM jobs
         WHERE created_at > NOW() - ($1 || ' days')::interval
         GROUP BY day ORDER BY day",
    )
    .bind(days.to_string())
    .fetch_all(&state.pool)
    .await?;

    let matches_created = sqlx::query_as::<_, DailyCount>(
        "SELECT created_at::date AS day, COUNT(*) AS count FROM matches
         WHERE created_at > NOW() - ($1 || ' days')::interval
         GROUP BY day ORDER BY day",
    )
    .bind(days.to_string())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(Analytics { jobs_ingested, matches_created }))
}
