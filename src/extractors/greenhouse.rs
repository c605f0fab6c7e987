use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::error::StageError;
use crate::fetcher::Fetcher;
use crate::models::company::{AtsType, Company};
use crate::models::raw_job::RawJobFields;

use super::{ExtractedJob, Extractor, Listing};

#[derive(Deserialize, Debug)]
struct GreenhouseLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GreenhouseJob {
    #[serde(default)]
    absolute_url: Option<String>,
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    location: Option<GreenhouseLocation>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    metadata: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize, Debug)]
struct GreenhouseBoardResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

pub fn board_url(token: &str) -> String {
    format!("https://boards-api.greenhouse.io/v1/boards/{token}/jobs?content=true")
}

pub struct GreenhouseExtractor;

#[async_trait]
impl Extractor for GreenhouseExtractor {
    fn ats_type(&self) -> AtsType {
        AtsType::Greenhouse
    }

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError> {
        let token = company
            .ats_identifier
            .as_deref()
            .ok_or_else(|| StageError::ParseError("company has no greenhouse identifier".to_string()))?;
        let url = board_url(token);

        let outcome = match fetcher.fetch(pool, company.id, &url, None, true, false).await {
            Ok(outcome) => outcome,
            Err(StageError::NotFound) => return Ok(Listing::Jobs(Vec::new())),
            Err(err) => return Err(err),
        };

        if outcome.unchanged {
            return Ok(Listing::Unchanged);
        }
        let Some(body) = outcome.html else {
            return Ok(Listing::Jobs(Vec::new()));
        };

        let parsed: GreenhouseBoardResponse =
            serde_json::from_str(&body).map_err(|e| StageError::ParseError(e.to_string()))?;

        let jobs = parsed
            .jobs
            .into_iter()
            .filter_map(|job| {
                let source_url = job.absolute_url?;
                Some(ExtractedJob {
                    source_url,
                    fields: RawJobFields {
                        title_raw: Some(job.title),
                        description_raw: job.content,
                        location_raw: job.location.and_then(|l| l.name),
                        salary_raw: None,
                        employment_type_raw: None,
                        posted_at_raw: job.updated_at,
                        raw_payload: Some(json!({ "metadata": job.metadata })),
                    },
                })
            })
            .collect();

        Ok(Listing::Jobs(jobs))
    }
}
