use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::StageError;
use crate::fetcher::Fetcher;
use crate::models::company::{AtsType, Company};
use crate::models::raw_job::RawJobFields;

use super::{ExtractedJob, Extractor, Listing};

const FULL_EXCERPT_CHARS: usize = 12_000;
const REDUCED_EXCERPT_CHARS: usize = 4_000;

#[derive(Deserialize, Debug)]
struct LlmJob {
    title: String,
    url: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LlmExtractionResult {
    jobs: Vec<LlmJob>,
}

pub struct CustomLlmExtractor {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl CustomLlmExtractor {
    pub fn new(config: &Config) -> Self {
        let client = config.llm_api_key.as_ref().map(|key| {
            let mut openai_config = OpenAIConfig::new().with_api_key(key);
            if let Some(base) = &config.llm_api_base {
                openai_config = openai_config.with_api_base(base);
            }
            Client::with_config(openai_config)
        });
        Self {
            client,
            model: config.llm_model.clone(),
        }
    }

    async fn extract_with_excerpt(&self, excerpt: &str) -> Result<LlmExtractionResult, StageError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| StageError::ParseError("no language-model endpoint configured".to_string()))?;

        let schema = json!({
            "type": "object",
            "properties": {
                "jobs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "url": {"type": "string"},
                            "location": {"type": ["string", "null"]},
                            "description": {"type": ["string", "null"]},
                            "salary": {"type": ["string", "null"]},
                            "employment_type": {"type": ["string", "null"]}
                        },
                        "required": ["title", "url"]
                    }
                }
            },
            "required": ["jobs"]
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "job_extraction".to_string(),
                    description: Some("Job postings found on a careers page".to_string()),
                    schema: Some(schema),
                    strict: Some(true),
                },
            })
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(
                        "Extract every distinct job posting from the page text. \
                         Return an empty jobs array if none are present. Never invent jobs.",
                    )
                    .build()
                    .map_err(|e| StageError::ParseError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(excerpt.to_string())
                    .build()
                    .map_err(|e| StageError::ParseError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| StageError::ParseError(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StageError::SchemaViolation("empty completion".to_string()))?;

        serde_json::from_str(&content).map_err(|e| StageError::SchemaViolation(e.to_string()))
    }
}

#[async_trait]
impl Extractor for CustomLlmExtractor {
    fn ats_type(&self) -> AtsType {
        AtsType::Custom
    }

    async fn list(&self, fetcher: &Fetcher, pool: &PgPool, company: &Company) -> Result<Listing, StageError> {
        let Some(careers_url) = company.careers_url.as_deref() else {
            return Ok(Listing::Jobs(Vec::new()));
        };

        let plain = fetcher.fetch(pool, company.id, careers_url, None, false, false).await?;
        if plain.unchanged {
            return Ok(Listing::Unchanged);
        }
        let plain_text = plain.html.unwrap_or_default();
        let needs_render = !has_job_links(&plain_text);

        let page_text = if needs_render {
            let rendered = fetcher.fetch(pool, company.id, careers_url, None, false, true).await?;
            rendered.html.unwrap_or(plain_text)
        } else {
            plain_text
        };

        let excerpt: String = page_text.chars().take(FULL_EXCERPT_CHARS).collect();
        let result = match self.extract_with_excerpt(&excerpt).await {
            Ok(result) => result,
            Err(_) => {
                let reduced: String = page_text.chars().take(REDUCED_EXCERPT_CHARS).collect();
                match self.extract_with_excerpt(&reduced).await {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::warn!(
                            company_id = company.id,
                            "extractor_llm_failed: {err}"
                        );
                        return Ok(Listing::Jobs(Vec::new()));
                    }
                }
            }
        };

        let jobs = result
            .jobs
            .into_iter()
            .map(|job| ExtractedJob {
                source_url: job.url,
                fields: RawJobFields {
                    title_raw: Some(job.title),
                    description_raw: job.description,
                    location_raw: job.location,
                    salary_raw: job.salary,
                    employment_type_raw: job.employment_type,
                    posted_at_raw: None,
                    raw_payload: Some(json!({})),
                },
            })
            .collect();

        Ok(Listing::Jobs(jobs))
    }
}

fn has_job_links(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return false;
    };
    document.select(&selector).any(|el| {
        el.value()
            .attr("href")
            .map(|href| {
                let lower = href.to_ascii_lowercase();
                lower.contains("job") || lower.contains("career") || lower.contains("position")
            })
            .unwrap_or(false)
    })
}
