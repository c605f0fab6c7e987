use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::error::StageError;
use crate::fetcher::Fetcher;
use crate::models::company::{AtsType, Company};
use crate::models::raw_job::RawJobFields;

use super::{ExtractedJob, Extractor, Listing};

const PAGE_SIZE: u32 = 20;
const MAX_PAGES: u32 = 50;

#[derive(Deserialize, Debug)]
struct WorkdayPosting {
    #[serde(rename = "externalPath")]
    external_path: String,
    title: String,
    #[serde(rename = "locationsText", default)]
    locations_text: Option<String>,
    #[serde(rename = "postedOn", default)]
    posted_on: Option<String>,
}

#[derive(Deserialize, Debug)]
struct WorkdaySearchResponse {
    #[serde(default)]
    total: u32,
    #[serde(rename = "jobPostings", default)]
    job_postings: Vec<WorkdayPosting>,
}

pub struct WorkdayExtractor;

#[async_trait]
impl Extractor for WorkdayExtractor {
    fn ats_type(&self) -> AtsType {
        AtsType::Workday
    }

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError> {
        let org = company
            .ats_identifier
            .as_deref()
            .ok_or_else(|| StageError::ParseError("company has no workday identifier".to_string()))?;

        let base = format!("https://{org}.myworkdayjobs.com/wday/cxs/{org}/External/jobs");
        let mut jobs = Vec::new();
        let mut offset = 0u32;

        for _ in 0..MAX_PAGES {
            let outcome = match fetcher
                .fetch_post(
                    pool,
                    company.id,
                    &base,
                    &json!({ "limit": PAGE_SIZE, "offset": offset, "searchText": "" }),
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(StageError::NotFound) => break,
                Err(err) => return Err(err),
            };

            if outcome.unchanged && jobs.is_empty() {
                return Ok(Listing::Unchanged);
            }
            let Some(body) = outcome.html else {
                break;
            };

            let page: WorkdaySearchResponse =
                serde_json::from_str(&body).map_err(|e| StageError::ParseError(e.to_string()))?;

            let page_count = page.job_postings.len() as u32;
            for posting in page.job_postings {
                jobs.push(ExtractedJob {
                    source_url: format!(
                        "https://{org}.myworkdayjobs.com/External{}",
                        posting.external_path
                    ),
                    fields: RawJobFields {
                        title_raw: Some(posting.title),
                        description_raw: None,
                        location_raw: posting.locations_text,
                        salary_raw: None,
                        employment_type_raw: None,
                        posted_at_raw: posting.posted_on,
                        raw_payload: Some(json!({})),
                    },
                });
            }

            offset += PAGE_SIZE;
            if page_count < PAGE_SIZE || offset >= page.total {
                break;
            }
        }

        Ok(Listing::Jobs(jobs))
    }
}
