pub mod ashby;
pub mod custom_llm;
pub mod enrichment;
pub mod greenhouse;
pub mod lever;
pub mod workday;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::StageError;
use crate::fetcher::Fetcher;
use crate::models::company::{AtsType, Company};
use crate::models::raw_job::RawJobFields;

/// One posting as observed, prior to persistence. The orchestrator upserts
/// this into `jobs_raw`, mirroring the teacher's separation between a
/// collector producing records and the runner persisting them.
pub struct ExtractedJob {
    pub source_url: String,
    pub fields: RawJobFields,
}

/// Result of re-listing a company's board. `Unchanged` means the fetcher
/// found the board byte-identical to the last crawl and did not re-parse
/// it — callers must not treat that the same as `Jobs(vec![])`, which means
/// the board was parsed and genuinely has no postings.
pub enum Listing {
    Jobs(Vec<ExtractedJob>),
    Unchanged,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    fn ats_type(&self) -> AtsType;

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError>;
}

pub fn get_extractor(ats_type: AtsType, config: &Config) -> Option<Box<dyn Extractor>> {
    match ats_type {
        AtsType::Greenhouse => Some(Box::new(greenhouse::GreenhouseExtractor)),
        AtsType::Lever => Some(Box::new(lever::LeverExtractor)),
        AtsType::Ashby => Some(Box::new(ashby::AshbyExtractor)),
        AtsType::Workday => Some(Box::new(workday::WorkdayExtractor)),
        AtsType::Custom => Some(Box::new(custom_llm::CustomLlmExtractor::new(config))),
        AtsType::Unknown => None,
    }
}

/// Used by the detector's API-probing step: a 200 with a parseable body
/// confirms the vendor for the guessed identifier.
pub async fn probe_identifier(
    fetcher: &Fetcher,
    pool: &PgPool,
    company_id: i32,
    ats_type: AtsType,
    identifier: &str,
) -> Result<bool, StageError> {
    let url = match ats_type {
        AtsType::Greenhouse => greenhouse::board_url(identifier),
        AtsType::Lever => lever::postings_url(identifier),
        AtsType::Ashby => ashby::board_url(identifier),
        _ => return Ok(false),
    };

    match fetcher.fetch(pool, company_id, &url, None, true, false).await {
        Ok(outcome) => Ok(outcome.html.is_some() || outcome.unchanged),
        Err(StageError::NotFound) => Ok(false),
        Err(err) => Err(err),
    }
}
