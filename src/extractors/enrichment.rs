use scraper::{Html, Selector};
use sqlx::PgPool;

use crate::fetcher::Fetcher;
use crate::models::raw_job::RawJob;

const DESCRIPTION_CHAR_CAP: usize = 20_000;

/// Fetches each pending raw job's detail URL and writes back a description.
/// Per-job failures are soft: they set `enrich_failed_at` and never abort
/// the batch. Returns `(enriched, failed)`.
pub async fn enrich_company(pool: &PgPool, fetcher: &Fetcher, company_id: i32, skip_window_hours: i64) -> (u32, u32) {
    let pending = match RawJob::pending_enrichment(pool, company_id, skip_window_hours).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!("failed to list pending enrichment for company {company_id}: {err}");
            return (0, 0);
        }
    };

    let mut enriched = 0;
    let mut failed = 0;

    for raw in pending {
        if raw.description_raw.as_deref().is_some_and(|d| !d.is_empty()) {
            continue;
        }

        match fetcher
            .fetch(pool, company_id, &raw.source_url, None, false, false)
            .await
        {
            Ok(outcome) => {
                let Some(html) = outcome.html else {
                    enriched += 1;
                    continue;
                };
                let text = extract_body_text(&html);
                if let Err(err) = RawJob::set_description(pool, raw.id, &text).await {
                    tracing::warn!("failed to persist enrichment for raw job {}: {err}", raw.id);
                }
                enriched += 1;
            }
            Err(err) => {
                tracing::warn!("enrichment fetch failed for raw job {}: {err}", raw.id);
                let _ = RawJob::mark_enrich_failed(pool, raw.id).await;
                failed += 1;
            }
        }
    }

    (enriched, failed)
}

fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let text: String = document
        .select(&selector)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(DESCRIPTION_CHAR_CAP)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_collapses_whitespace() {
        let html = "<html><body>  <h1>Engineer</h1>\n\n<p>Build  things</p></body></html>";
        let text = extract_body_text(html);
        assert_eq!(text, "Engineer Build things");
    }
}
