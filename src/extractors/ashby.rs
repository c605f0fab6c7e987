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
struct AshbyJobPosting {
    #[serde(default)]
    #[serde(rename = "jobUrl")]
    job_url: Option<String>,
    title: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "descriptionPlain", default)]
    description_plain: Option<String>,
    #[serde(rename = "employmentType", default)]
    employment_type: Option<String>,
    #[serde(rename = "publishedAt", default)]
    published_at: Option<String>,
    #[serde(rename = "isListed", default)]
    is_listed: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct AshbyJobBoardResponse {
    #[serde(default)]
    jobs: Vec<AshbyJobPosting>,
}

pub fn board_url(slug: &str) -> String {
    format!("https://api.ashbyhq.com/posting-api/job-board/{slug}?includeCompensation=true")
}

pub struct AshbyExtractor;

#[async_trait]
impl Extractor for AshbyExtractor {
    fn ats_type(&self) -> AtsType {
        AtsType::Ashby
    }

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError> {
        let slug = company
            .ats_identifier
            .as_deref()
            .ok_or_else(|| StageError::ParseError("company has no ashby identifier".to_string()))?;
        let url = board_url(slug);

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

        let parsed: AshbyJobBoardResponse =
            serde_json::from_str(&body).map_err(|e| StageError::ParseError(e.to_string()))?;

        let jobs = parsed
            .jobs
            .into_iter()
            .filter(|job| job.is_listed.unwrap_or(true))
            .filter_map(|job| {
                let source_url = job.job_url?;
                Some(ExtractedJob {
                    source_url,
                    fields: RawJobFields {
                        title_raw: Some(job.title),
                        description_raw: job.description_plain,
                        location_raw: job.location,
                        salary_raw: None,
                        employment_type_raw: job.employment_type,
                        posted_at_raw: job.published_at,
                        raw_payload: Some(json!({})),
                    },
                })
            })
            .collect();

        Ok(Listing::Jobs(jobs))
    }
}
