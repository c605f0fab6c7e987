use chrono::Utc;
use sqlx::PgPool;

use crate::config::Config;
use crate::discovery;
use crate::embedder::{self, Embedder};
use crate::error::AppError;
use crate::extractors::{self, Listing};
use crate::fetcher::Fetcher;
use crate::maintenance;
use crate::models::company::{AtsType, Company, CompanyFilters};
use crate::models::pipeline_run::RunStatus;
use crate::models::raw_job::RawJob;
use crate::normalizer;
use crate::orchestrator::registry::{FULL_PIPELINE, RunRegistry};

/// Stage-level skip flags for a full pipeline run, mirroring the
/// orchestrator's directed-graph composition.
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct PipelineFlags {
    #[serde(default)]
    pub skip_discovery: bool,
    #[serde(default)]
    pub skip_crawl: bool,
    #[serde(default)]
    pub skip_enrichment: bool,
    #[serde(default)]
    pub skip_embeddings: bool,
    #[serde(default)]
    pub skip_maintenance: bool,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct StageCounts {
    pub processed: u32,
    pub failed: u32,
}

/// Runs discovery → crawl (all ATS types) → enrichment → embeddings →
/// maintenance sequentially with `cascade = true`. Matching is deliberately
/// excluded; it runs on candidate updates or its own cron, not as part of a
/// full run.
pub async fn run_full_pipeline(
    pool: &PgPool,
    fetcher: &Fetcher,
    config: &Config,
    registry: &RunRegistry,
    flags: PipelineFlags,
) -> Result<i32, AppError> {
    let (run_id, cancel) = registry.start(pool, FULL_PIPELINE, true).await?;

    let result: Result<(), AppError> = async {
        if !flags.skip_discovery && !cancel.is_cancelled() {
            report_step(pool, run_id, "discovery", 0.1).await;
            discovery_stage(pool, fetcher).await?;
        }
        if !flags.skip_crawl && !cancel.is_cancelled() {
            report_step(pool, run_id, "crawl", 0.35).await;
            crawl_stage(pool, fetcher, config, None).await?;
        }
        if !flags.skip_enrichment && !cancel.is_cancelled() {
            report_step(pool, run_id, "enrichment", 0.6).await;
            enrichment_stage(pool, fetcher).await?;
        }
        if !flags.skip_embeddings && !cancel.is_cancelled() {
            report_step(pool, run_id, "embeddings", 0.8).await;
            let embedder = embedder::build_embedder(config);
            embedding_stage(pool, embedder.as_ref()).await?;
        }
        if !flags.skip_maintenance && !cancel.is_cancelled() {
            report_step(pool, run_id, "maintenance", 0.95).await;
            maintenance::run(pool, fetcher, config, config.verify_refresh_days).await?;
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) if cancel.is_cancelled() => {
            registry.finish(pool, FULL_PIPELINE, RunStatus::Failed, Some("cancelled")).await?;
        }
        Ok(()) => {
            registry.finish(pool, FULL_PIPELINE, RunStatus::Completed, None).await?;
        }
        Err(err) => {
            registry.finish(pool, FULL_PIPELINE, RunStatus::Failed, Some(&err.to_string())).await?;
        }
    }

    Ok(run_id)
}

async fn report_step(pool: &PgPool, run_id: i32, step: &str, progress: f32) {
    if let Err(err) = crate::models::pipeline_run::PipelineRun::update_progress(pool, run_id, step, progress, 0, 0).await {
        tracing::warn!("failed to update pipeline run {run_id} progress: {err}");
    }
}

/// Runs every enabled discovery source, enqueues what it finds, then
/// drains the queue (ATS detection for each newly queued company).
pub async fn discovery_stage(pool: &PgPool, fetcher: &Fetcher) -> Result<StageCounts, AppError> {
    let mut counts = StageCounts::default();
    for source in discovery::enabled_sources(None) {
        let produced = match source.produce(50).await {
            Ok(companies) => companies,
            Err(err) => {
                tracing::warn!("discovery source {} failed: {err}", source.name());
                counts.failed += 1;
                continue;
            }
        };
        for company in produced {
            match discovery::queue::enqueue(pool, source.name(), company).await {
                Ok(_) => counts.processed += 1,
                Err(err) => {
                    tracing::warn!("failed to enqueue discovered company: {err}");
                    counts.failed += 1;
                }
            }
        }
    }

    let (processed, failed) = discovery::queue::process_queue(pool, fetcher, 100).await;
    counts.processed += processed;
    counts.failed += failed;
    Ok(counts)
}

/// Crawls every active company with a known ATS type, or only companies on
/// `ats_filter` when given (the per-vendor admin trigger, e.g. `greenhouse`).
/// Extracts postings, persists them as raw jobs, normalizes, and upserts the
/// canonical job.
pub async fn crawl_stage(
    pool: &PgPool,
    fetcher: &Fetcher,
    config: &Config,
    ats_filter: Option<&str>,
) -> Result<StageCounts, AppError> {
    let companies = Company::list(
        pool,
        &CompanyFilters { is_active: Some(true), ats_type: ats_filter.map(str::to_string) },
    )
    .await?;
    let mut counts = StageCounts::default();

    for company in companies {
        let ats_type = AtsType::parse(&company.ats_type);
        if matches!(ats_type, AtsType::Unknown) {
            continue;
        }
        let Some(extractor) = extractors::get_extractor(ats_type, config) else {
            continue;
        };

        match extractor.list(fetcher, pool, &company).await {
            Ok(Listing::Unchanged) => {
                let _ = Company::record_crawl(pool, company.id).await;
            }
            Ok(Listing::Jobs(jobs)) => {
                for extracted in jobs {
                    match RawJob::upsert(pool, company.id, &extracted.source_url, extracted.fields).await {
                        Ok(raw) => {
                            let normalized = normalizer::normalize(&raw, Utc::now());
                            let source_url = raw.source_url.clone();
                            match crate::models::job::Job::upsert(pool, company.id, Some(raw.id), &source_url, normalized).await {
                                Ok(job) => {
                                    let _ = RawJob::set_canonical_job(pool, raw.id, job.id).await;
                                    counts.processed += 1;
                                }
                                Err(err) => {
                                    tracing::error!("failed to upsert job for raw job {}: {err}", raw.id);
                                    counts.failed += 1;
                                }
                            }
                        }
                        Err(err) => {
                            tracing::error!("failed to upsert raw job for company {}: {err}", company.id);
                            counts.failed += 1;
                        }
                    }
                }
                let _ = Company::record_crawl(pool, company.id).await;
            }
            Err(err) => {
                tracing::warn!("crawl failed for company {}: {err}", company.id);
                counts.failed += 1;
            }
        }
    }

    Ok(counts)
}

/// Enriches pending raw jobs for every active company.
pub async fn enrichment_stage(pool: &PgPool, fetcher: &Fetcher) -> Result<StageCounts, AppError> {
    let companies = Company::list(pool, &CompanyFilters { is_active: Some(true), ats_type: None }).await?;
    let mut counts = StageCounts::default();
    for company in companies {
        let (enriched, failed) = extractors::enrichment::enrich_company(pool, fetcher, company.id, 24).await;
        counts.processed += enriched;
        counts.failed += failed;
    }
    Ok(counts)
}

/// Embeds every job and candidate missing a vector.
pub async fn embedding_stage(pool: &PgPool, embedder: &dyn Embedder) -> Result<StageCounts, AppError> {
    let jobs = embedder::embed_missing_jobs(pool, embedder).await?;
    let candidates = embedder::embed_missing_candidates(pool, embedder).await?;
    Ok(StageCounts { processed: jobs + candidates, failed: 0 })
}

/// Single-stage maintenance trigger, independent of the full pipeline.
pub async fn maintenance_stage(pool: &PgPool, fetcher: &Fetcher, config: &Config) -> Result<maintenance::MaintenanceSummary, AppError> {
    maintenance::run(pool, fetcher, config, config.verify_refresh_days).await
}
