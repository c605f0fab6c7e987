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
struct LeverCategories {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    commitment: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LeverSalaryRange {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LeverPosting {
    #[serde(default)]
    #[serde(rename = "hostedUrl")]
    hosted_url: Option<String>,
    text: String,
    #[serde(default)]
    categories: Option<LeverCategories>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "salaryRange", default)]
    salary_range: Option<LeverSalaryRange>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<f64>,
}

pub fn postings_url(site: &str) -> String {
    format!("https://api.lever.co/v0/postings/{site}?mode=json")
}

pub struct LeverExtractor;

#[async_trait]
impl Extractor for LeverExtractor {
    fn ats_type(&self) -> AtsType {
        AtsType::Lever
    }

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError> {
        let site = company
            .ats_identifier
            .as_deref()
            .ok_or_else(|| StageError::ParseError("company has no lever identifier".to_string()))?;
        let url = postings_url(site);

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

        let postings: Vec<LeverPosting> =
            serde_json::from_str(&body).map_err(|e| StageError::ParseError(e.to_string()))?;

        let jobs = postings
            .into_iter()
            .filter_map(|posting| {
                let source_url = posting.hosted_url?;
                let salary_raw = posting.salary_range.as_ref().map(|range| {
                    format!(
                        "{}-{} {}",
                        range.min.unwrap_or_default(),
                        range.max.unwrap_or_default(),
                        range.currency.clone().unwrap_or_default()
                    )
                });
                let posted_at_raw = posting
                    .created_at
                    .map(|millis| (millis as i64).to_string());

                Some(ExtractedJob {
                    source_url,
                    fields: RawJobFields {
                        title_raw: Some(posting.text),
                        description_raw: posting.description,
                        location_raw: posting.categories.as_ref().and_then(|c| c.location.clone()),
                        salary_raw,
                        employment_type_raw: posting.categories.and_then(|c| c.commitment),
                        posted_at_raw,
                        raw_payload: Some(json!({})),
                    },
                })
            })
            .collect();

        Ok(Listing::Jobs(jobs))
    }
}
