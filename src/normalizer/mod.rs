pub mod location;
pub mod role_family;
pub mod salary;
pub mod seniority;
pub mod skills;

use chrono::{DateTime, Utc};

use crate::models::job::NormalizedJob;
use crate::models::raw_job::RawJob;

const EMPLOYMENT_TYPES: &[(&str, &str)] = &[
    ("full-time", "full_time"),
    ("full time", "full_time"),
    ("part-time", "part_time"),
    ("part time", "part_time"),
    ("contract", "contract"),
    ("freelance", "freelance"),
    ("intern", "internship"),
];

fn classify_employment_type(raw: Option<&str>) -> &'static str {
    if let Some(raw) = raw {
        let lowered = raw.to_ascii_lowercase();
        if let Some((_, kind)) = EMPLOYMENT_TYPES.iter().find(|(kw, _)| lowered.contains(kw)) {
            return kind;
        }
    }
    "full_time"
}

/// `0.5^(age_days / 7)`: a job posted today scores 1.0, one posted a week
/// ago scores 0.5, halving again every week after. Jobs with no posting
/// date default to 0.5 — "moderately fresh", neither penalized nor boosted.
pub fn freshness_score(posted_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    match posted_at {
        Some(posted_at) => {
            let age_days = (now - posted_at).num_seconds() as f32 / 86_400.0;
            0.5_f32.powf(age_days.max(0.0) / 7.0)
        }
        None => 0.5,
    }
}

/// Pure, deterministic transform from an extractor's raw fields to the
/// closed-set schema jobs are stored and matched against. Given the same
/// `RawJob` and `now`, always produces the same `NormalizedJob`.
pub fn normalize(raw: &RawJob, now: DateTime<Utc>) -> NormalizedJob {
    let title = raw.title_raw.clone().unwrap_or_default();
    let description = raw.description_raw.as_deref();

    let role_family = role_family::classify(&title).to_string();
    let seniority = seniority::infer(&title, description).map(|s| s.to_string());

    let location_text = raw.location_raw.as_deref().unwrap_or("");
    let location_type = location::classify_location_type(location_text).map(|s| s.to_string());
    let locations = location::extract_locations(location_text);

    let skill_source = description.unwrap_or("");
    let skills = skills::extract_skills(skill_source);

    let salary_text = raw.salary_raw.as_deref().unwrap_or("");
    let salary_range = salary::extract_salary(salary_text);

    let posted_at = raw
        .posted_at_raw
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    NormalizedJob {
        title,
        role_family,
        role_specialization: None,
        seniority,
        location_type,
        locations,
        skills,
        min_salary: salary_range.map(|r| r.min.round() as i32),
        max_salary: salary_range.map(|r| r.max.round() as i32),
        employment_type: Some(classify_employment_type(raw.employment_type_raw.as_deref()).to_string()),
        posted_at,
        freshness_score: freshness_score(posted_at, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_is_one_for_a_job_posted_right_now() {
        let now = Utc::now();
        assert!((freshness_score(Some(now), now) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn freshness_halves_after_a_week() {
        let now = Utc::now();
        let posted = now - chrono::Duration::days(7);
        let score = freshness_score(Some(posted), now);
        assert!((score - 0.5).abs() < 1e-3);
    }

    #[test]
    fn missing_posted_at_defaults_to_half() {
        let now = Utc::now();
        assert_eq!(freshness_score(None, now), 0.5);
    }

    #[test]
    fn employment_type_defaults_to_full_time() {
        assert_eq!(classify_employment_type(None), "full_time");
        assert_eq!(classify_employment_type(Some("Contract (6mo)")), "contract");
    }
}
