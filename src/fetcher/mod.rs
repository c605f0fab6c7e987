pub mod rate_limit;
pub mod render;
pub mod retry;
pub mod robots;

use std::time::Duration;

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use url::Url;

use crate::error::StageError;
use crate::models::crawl_snapshot::CrawlSnapshot;
use rate_limit::HostRateLimiters;
use robots::RobotsCache;

const PLAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a single fetch. `html` is `None` when the content digest
/// matches the most recent snapshot for the URL — the caller should treat
/// this as "nothing new to extract" without re-persisting a snapshot.
#[derive(Debug)]
pub struct FetchOutcome {
    pub html: Option<String>,
    pub status_code: u16,
    pub rendered: bool,
    pub unchanged: bool,
}

pub struct Fetcher {
    client: reqwest::Client,
    rate_limiters: HostRateLimiters,
    robots: RobotsCache,
    render_service_url: Option<String>,
}

impl Fetcher {
    pub fn new(user_agent: &str, render_service_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(PLAIN_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("fetcher http client builds");

        Self {
            robots: RobotsCache::new(client.clone()),
            rate_limiters: HostRateLimiters::new(),
            client,
            render_service_url,
        }
    }

    /// Retrieves `url`, honoring rate limits, robots.txt (unless
    /// `is_api_endpoint`), and retry policy, then records a crawl snapshot
    /// if the content changed since the last crawl of this URL.
    pub async fn fetch(
        &self,
        pool: &PgPool,
        company_id: i32,
        url: &str,
        ats_type: Option<&str>,
        is_api_endpoint: bool,
        rendered: bool,
    ) -> Result<FetchOutcome, StageError> {
        let parsed = Url::parse(url).map_err(|e| StageError::ParseError(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StageError::ParseError("url has no host".to_string()))?
            .to_string();

        if !is_api_endpoint && !self.robots.is_allowed(&parsed).await {
            return Err(StageError::RobotsDenied);
        }

        self.rate_limiters.acquire(&host, ats_type).await;

        let (body, status_code) = self.fetch_with_retry(url, rendered).await?;

        let hash = content_hash(&body);
        let previous = CrawlSnapshot::latest_for_url(pool, company_id, url)
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        if previous.as_ref().map(|s| s.html_hash.as_str()) == Some(hash.as_str()) {
            return Ok(FetchOutcome {
                html: None,
                status_code,
                rendered,
                unchanged: true,
            });
        }

        CrawlSnapshot::insert(pool, company_id, url, Some(&body), &hash, status_code as i16, rendered)
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        Ok(FetchOutcome {
            html: Some(body),
            status_code,
            rendered,
            unchanged: false,
        })
    }

    /// POST-based variant used by vendors (Workday) whose search API takes
    /// a JSON body rather than query parameters. Always treated as an API
    /// endpoint: no robots.txt check, no rendering.
    pub async fn fetch_post(
        &self,
        pool: &PgPool,
        company_id: i32,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<FetchOutcome, StageError> {
        let parsed = Url::parse(url).map_err(|e| StageError::ParseError(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StageError::ParseError("url has no host".to_string()))?
            .to_string();

        self.rate_limiters.acquire(&host, None).await;

        let mut attempt = 0;
        let (response_body, status_code) = loop {
            match self.post_once(url, body).await {
                Ok(ok) => break ok,
                Err(err) if err.is_fatal() || attempt + 1 >= retry::max_attempts() => return Err(err),
                Err(_) => {
                    tokio::time::sleep(retry::backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        };

        let hash = content_hash(&response_body);
        let previous = CrawlSnapshot::latest_for_url(pool, company_id, url)
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        if previous.as_ref().map(|s| s.html_hash.as_str()) == Some(hash.as_str()) {
            return Ok(FetchOutcome {
                html: None,
                status_code,
                rendered: false,
                unchanged: true,
            });
        }

        CrawlSnapshot::insert(
            pool,
            company_id,
            url,
            Some(&response_body),
            &hash,
            status_code as i16,
            false,
        )
        .await
        .map_err(|e| StageError::Transport(e.to_string()))?;

        Ok(FetchOutcome {
            html: Some(response_body),
            status_code,
            rendered: false,
            unchanged: false,
        })
    }

    async fn post_once(&self, url: &str, body: &serde_json::Value) -> Result<(String, u16), StageError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StageError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StageError::RateLimited);
        }
        if status.is_client_error() {
            return Err(StageError::HttpClientError(status.to_string()));
        }
        if status.is_server_error() {
            return Err(StageError::HttpServerError(status.to_string()));
        }

        let status_code = status.as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;
        Ok((text, status_code))
    }

    async fn fetch_with_retry(&self, url: &str, rendered: bool) -> Result<(String, u16), StageError> {
        let mut attempt = 0;
        loop {
            let outcome = if rendered {
                self.fetch_rendered(url).await
            } else {
                self.fetch_plain(url).await
            };

            match outcome {
                Ok(ok) => return Ok(ok),
                Err(err) if err.is_fatal() || attempt + 1 >= retry::max_attempts() => return Err(err),
                Err(StageError::RateLimited) => {
                    tokio::time::sleep(retry::capped_retry_after(Duration::from_secs(1))).await;
                }
                Err(_) => {
                    tokio::time::sleep(retry::backoff_delay(attempt)).await;
                }
            }
            attempt += 1;
        }
    }

    async fn fetch_plain(&self, url: &str) -> Result<(String, u16), StageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StageError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if let Some(retry_after) = parse_retry_after(response.headers()) {
                tokio::time::sleep(retry::capped_retry_after(retry_after)).await;
            }
            return Err(StageError::RateLimited);
        }
        if status.is_client_error() {
            return Err(StageError::HttpClientError(status.to_string()));
        }
        if status.is_server_error() {
            return Err(StageError::HttpServerError(status.to_string()));
        }

        let status_code = status.as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StageError::Transport(e.to_string()))?;
        Ok((body, status_code))
    }

    async fn fetch_rendered(&self, url: &str) -> Result<(String, u16), StageError> {
        let render_service_url = self
            .render_service_url
            .as_deref()
            .ok_or_else(|| StageError::Transport("no render service configured".to_string()))?;
        render::render_page(&self.client, render_service_url, url).await
    }
}

fn content_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex::encode(digest)
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_a_pure_function_of_content() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("world"));
    }
}
