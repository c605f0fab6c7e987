use scraper::{Html, Selector};
use url::Url;

use crate::error::StageError;
use crate::extractors;
use crate::fetcher::Fetcher;
use crate::models::company::AtsType;

/// Outcome of running ATS detection against a company's URLs.
#[derive(Debug, Clone)]
pub struct Detection {
    pub ats_type: AtsType,
    pub ats_identifier: Option<String>,
    pub careers_url: Option<String>,
}

/// Ordered, first-hit-wins detection: URL pattern match, then HTML probe,
/// then API probe, then `custom` as the fallback classification.
pub async fn detect(
    fetcher: &Fetcher,
    pool: &sqlx::PgPool,
    company_id: i32,
    website_url: Option<&str>,
    careers_url: Option<&str>,
) -> Detection {
    let candidate_urls: Vec<String> = [
        careers_url.map(str::to_string),
        website_url.map(|w| format!("{}/careers", w.trim_end_matches('/'))),
        website_url.map(|w| format!("{}/jobs", w.trim_end_matches('/'))),
        website_url.map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .collect();

    for url in &candidate_urls {
        if let Some(detection) = match_url_pattern(url) {
            return detection;
        }
    }

    for url in &candidate_urls {
        if let Ok(parsed) = Url::parse(url)
            && let Ok(outcome) = fetcher.fetch(pool, company_id, url, None, false, false).await
            && let Some(html) = outcome.html
            && let Some(detection) = probe_html(&html, &parsed)
        {
            return detection;
        }
    }

    for url in &candidate_urls {
        if let Some(detection) = probe_api(fetcher, pool, company_id, url).await {
            return detection;
        }
    }

    Detection {
        ats_type: AtsType::Custom,
        ats_identifier: None,
        careers_url: careers_url.or(website_url).map(str::to_string),
    }
}

fn match_url_pattern(url: &str) -> Option<Detection> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    if host == "boards.greenhouse.io" {
        let id = segments.next()?.to_string();
        return Some(Detection {
            ats_type: AtsType::Greenhouse,
            ats_identifier: Some(id),
            careers_url: Some(url.to_string()),
        });
    }
    if host == "jobs.lever.co" {
        let id = segments.next()?.to_string();
        return Some(Detection {
            ats_type: AtsType::Lever,
            ats_identifier: Some(id),
            careers_url: Some(url.to_string()),
        });
    }
    if host == "jobs.ashbyhq.com" {
        let id = segments.next()?.to_string();
        return Some(Detection {
            ats_type: AtsType::Ashby,
            ats_identifier: Some(id),
            careers_url: Some(url.to_string()),
        });
    }
    if host.ends_with(".myworkdayjobs.com") {
        let id = host.split('.').next()?.to_string();
        return Some(Detection {
            ats_type: AtsType::Workday,
            ats_identifier: Some(id),
            careers_url: Some(url.to_string()),
        });
    }
    None
}

/// Inspects iframes, linked scripts, and outbound links for known ATS host
/// patterns embedded in a careers page.
fn probe_html(html: &str, page_url: &Url) -> Option<Detection> {
    let document = Html::parse_document(html);
    let link_selectors = [
        Selector::parse("iframe[src]").ok()?,
        Selector::parse("script[src]").ok()?,
        Selector::parse("a[href]").ok()?,
    ];

    for selector in &link_selectors {
        for element in document.select(selector) {
            let attr = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("href"))?;
            let resolved = page_url.join(attr).ok()?;
            if let Some(detection) = match_url_pattern(resolved.as_str()) {
                return Some(detection);
            }
        }
    }
    None
}

/// Attempts each vendor's well-known JSON endpoint using the domain as a
/// guessed identifier; a 200 with a parseable shape confirms the vendor.
async fn probe_api(
    fetcher: &Fetcher,
    pool: &sqlx::PgPool,
    company_id: i32,
    url: &str,
) -> Option<Detection> {
    let host = Url::parse(url).ok()?;
    let slug = host.host_str()?.split('.').next()?;

    for ats_type in [AtsType::Greenhouse, AtsType::Lever, AtsType::Ashby] {
        if let Ok(found) = extractors::probe_identifier(fetcher, pool, company_id, ats_type, slug).await
            && found
        {
            return Some(Detection {
                ats_type,
                ats_identifier: Some(slug.to_string()),
                careers_url: Some(url.to_string()),
            });
        }
    }
    None
}

pub fn classify_fetch_error(err: &StageError) -> &'static str {
    match err {
        StageError::NotFound => "not_found",
        StageError::RobotsDenied => "robots_denied",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_pattern_precedence_picks_greenhouse() {
        let detection = match_url_pattern("https://boards.greenhouse.io/acme").unwrap();
        assert_eq!(detection.ats_type, AtsType::Greenhouse);
        assert_eq!(detection.ats_identifier.as_deref(), Some("acme"));
    }

    #[test]
    fn unrelated_host_does_not_match() {
        assert!(match_url_pattern("https://acme.test/careers").is_none());
    }

    #[test]
    fn workday_subdomain_yields_org_as_identifier() {
        let detection = match_url_pattern("https://acme.myworkdayjobs.com/en-US/External").unwrap();
        assert_eq!(detection.ats_type, AtsType::Workday);
        assert_eq!(detection.ats_identifier.as_deref(), Some("acme"));
    }
}
