use sqlx::PgPool;

use crate::detector;
use crate::fetcher::Fetcher;
use crate::models::company::{Company, CreateCompany};
use crate::models::discovery_queue::{DiscoveredCandidate, DiscoveryQueueEntry};

use super::DiscoveredCompany;

/// Normalized domain (fallback: normalized name) so the same company
/// surfaced by two sources collapses into one queue row.
fn dedupe_key(company: &DiscoveredCompany) -> String {
    match &company.domain {
        Some(domain) => normalize_domain(domain),
        None => format!("name:{}", normalize_name(&company.name)),
    }
}

fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "-")
}

pub async fn enqueue(
    pool: &PgPool,
    source_name: &str,
    company: DiscoveredCompany,
) -> Result<DiscoveryQueueEntry, crate::error::AppError> {
    let candidate = DiscoveredCandidate {
        dedupe_key: dedupe_key(&company),
        name: company.name,
        domain: company.domain,
        careers_url: company.careers_url,
        website_url: company.website_url,
        source: source_name.to_string(),
        metadata: company.metadata,
    };
    DiscoveryQueueEntry::enqueue(pool, candidate).await
}

/// Claims and resolves up to `limit` pending entries: runs ATS detection
/// and either creates/updates a company (`completed`) or marks the entry
/// `skipped`/`failed` per the retry cap baked into `mark_failed`.
pub async fn process_queue(pool: &PgPool, fetcher: &Fetcher, limit: usize) -> (u32, u32) {
    let mut processed = 0;
    let mut failed = 0;

    for _ in 0..limit {
        let entry = match DiscoveryQueueEntry::claim_next(pool).await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::error!("failed to claim discovery queue entry: {err}");
                break;
            }
        };

        match resolve_entry(pool, fetcher, &entry).await {
            Ok(()) => {
                processed += 1;
                let _ = DiscoveryQueueEntry::mark_completed(pool, entry.id).await;
            }
            Err(err) => {
                failed += 1;
                tracing::warn!("discovery entry {} failed: {err}", entry.id);
                let _ = DiscoveryQueueEntry::mark_failed(pool, entry.id, &err).await;
            }
        }
    }

    (processed, failed)
}

async fn resolve_entry(
    pool: &PgPool,
    fetcher: &Fetcher,
    entry: &DiscoveryQueueEntry,
) -> Result<(), String> {
    let company = Company::find_or_create(
        pool,
        CreateCompany {
            name: entry.name.clone(),
            domain: entry.domain.clone(),
            careers_url: entry.careers_url.clone(),
            website_url: entry.website_url.clone(),
            discovery_source: Some(entry.source.clone()),
            country: None,
            industry: None,
            employee_count: None,
            funding_stage: None,
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let detection = detector::detect(
        fetcher,
        pool,
        company.id,
        company.website_url.as_deref(),
        company.careers_url.as_deref(),
    )
    .await;

    Company::set_ats(
        pool,
        company.id,
        detection.ats_type,
        detection.ats_identifier.as_deref(),
        detection.careers_url.as_deref(),
    )
    .await
    .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_normalization_strips_scheme_and_www() {
        assert_eq!(normalize_domain("https://www.Acme.test/"), "acme.test");
        assert_eq!(normalize_domain("acme.test"), "acme.test");
    }

    #[test]
    fn name_fallback_key_is_stable() {
        assert_eq!(normalize_name("Acme  Corp"), "acme--corp");
    }
}
