use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, StageError};
use crate::extractors::{self, ExtractedJob, Listing};
use crate::fetcher::Fetcher;
use crate::models::company::{AtsType, Company};
use crate::models::job::Job;

#[derive(Debug, Default)]
pub struct MaintenanceSummary {
    pub companies_checked: u32,
    pub jobs_verified: u32,
    pub jobs_delisted: u32,
    pub companies_deactivated: u32,
}

/// Re-verifies every company due for maintenance: re-lists postings from
/// its ATS, marks still-present jobs verified, and delists jobs that
/// dropped out of the listing. A careers URL that now 404s counts as a
/// not-found; two consecutive not-founds deactivate the company.
pub async fn run(pool: &PgPool, fetcher: &Fetcher, config: &Config, refresh_days: i64) -> Result<MaintenanceSummary, AppError> {
    let due = Company::due_for_maintenance(pool, refresh_days).await?;

    let mut summary = MaintenanceSummary::default();
    for company in due {
        summary.companies_checked += 1;
        match check_company(pool, fetcher, config, &company).await {
            Ok((verified, delisted, deactivated)) => {
                summary.jobs_verified += verified;
                summary.jobs_delisted += delisted;
                if deactivated {
                    summary.companies_deactivated += 1;
                }
            }
            Err(err) => {
                tracing::warn!("maintenance check failed for company {}: {err}", company.id);
            }
        }
        let _ = Company::record_maintenance(pool, company.id).await;
    }
    Ok(summary)
}

/// Returns `(jobs_verified, jobs_delisted, company_deactivated)`.
async fn check_company(
    pool: &PgPool,
    fetcher: &Fetcher,
    config: &Config,
    company: &Company,
) -> Result<(u32, u32, bool), StageError> {
    let ats_type = AtsType::parse(&company.ats_type);
    let Some(extractor) = extractors::get_extractor(ats_type, config) else {
        return Ok((0, 0, false));
    };

    let listing = match extractor.list(fetcher, pool, company).await {
        Ok(Listing::Jobs(listing)) => listing,
        Ok(Listing::Unchanged) => {
            // Board is byte-identical to the last crawl: every job that was
            // active before is still listed. Re-verify, delist nothing.
            Company::reset_not_found_streak(pool, company.id)
                .await
                .map_err(|e| StageError::ParseError(e.to_string()))?;
            let existing = Job::active_for_company(pool, company.id)
                .await
                .map_err(|e| StageError::ParseError(e.to_string()))?;
            let mut verified = 0;
            for job in &existing {
                Job::mark_verified(pool, job.id)
                    .await
                    .map_err(|e| StageError::ParseError(e.to_string()))?;
                verified += 1;
            }
            return Ok((verified, 0, false));
        }
        Err(StageError::NotFound) => {
            let deactivated = Company::record_not_found(pool, company.id)
                .await
                .map_err(|e| StageError::ParseError(e.to_string()))?;
            if deactivated {
                let delisted = Job::delist_all_for_company(pool, company.id, "company_inactive")
                    .await
                    .map_err(|e| StageError::ParseError(e.to_string()))?;
                return Ok((0, delisted as u32, true));
            }
            return Ok((0, 0, false));
        }
        Err(err) => return Err(err),
    };

    Company::reset_not_found_streak(pool, company.id)
        .await
        .map_err(|e| StageError::ParseError(e.to_string()))?;

    let listed_urls: Vec<&str> = listing.iter().map(|job: &ExtractedJob| job.source_url.as_str()).collect();

    let existing = Job::active_for_company(pool, company.id)
        .await
        .map_err(|e| StageError::ParseError(e.to_string()))?;

    let mut verified = 0;
    let mut delisted = 0;
    for job in existing {
        if listed_urls.contains(&job.source_url.as_str()) {
            Job::mark_verified(pool, job.id)
                .await
                .map_err(|e| StageError::ParseError(e.to_string()))?;
            verified += 1;
        } else {
            Job::delist(pool, job.id, "removed_from_ats")
                .await
                .map_err(|e| StageError::ParseError(e.to_string()))?;
            delisted += 1;
        }
    }

    Ok((verified, delisted, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_defaults_to_zero() {
        let summary = MaintenanceSummary::default();
        assert_eq!(summary.jobs_verified, 0);
        assert_eq!(summary.companies_deactivated, 0);
    }
}
