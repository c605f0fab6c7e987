use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::AppError;
use crate::models::candidate::CandidateProfile;
use crate::models::job::Job;
use crate::models::match_record::MatchRecord;
use crate::normalizer::seniority;

/// Top-K candidate jobs pulled per vector query before hard filters apply.
const CANDIDATE_SET_SIZE: i64 = 200;
/// Retrieval-stage cosine similarity floor; below this a job is not even
/// considered regardless of how well it would score on other dimensions.
const SIMILARITY_FLOOR: f32 = 0.5;

const WEIGHT_SEMANTIC: f32 = 0.40;
const WEIGHT_ROLE_FAMILY: f32 = 0.15;
const WEIGHT_SENIORITY: f32 = 0.15;
const WEIGHT_SKILLS: f32 = 0.15;
const WEIGHT_FRESHNESS: f32 = 0.10;
const WEIGHT_SALARY: f32 = 0.05;

/// Role families treated as adjacent for the 0.5-credit partial match,
/// e.g. an engineering manager candidate is a plausible fit for a
/// software engineering req and vice versa.
const ADJACENT_ROLE_FAMILIES: &[(&str, &str)] = &[
    ("engineering_management", "software_engineering"),
    ("software_engineering", "data_engineering"),
    ("software_engineering", "devops_sre"),
    ("data_engineering", "data_science"),
    ("devops_sre", "security"),
    ("product_management", "design"),
    ("sales", "customer_success"),
];

fn role_families_adjacent(a: &str, b: &str) -> bool {
    ADJACENT_ROLE_FAMILIES
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    EmptyCatalog,
    NoVectorCandidates,
    AllFilteredHard,
    AllFilteredScore,
}

impl NoMatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoMatchReason::EmptyCatalog => "empty_catalog",
            NoMatchReason::NoVectorCandidates => "no_vector_candidates",
            NoMatchReason::AllFilteredHard => "all_filtered_hard",
            NoMatchReason::AllFilteredScore => "all_filtered_score",
        }
    }
}

pub struct MatchOutcome {
    pub matched: Vec<MatchRecord>,
    pub no_match_reason: Option<NoMatchReason>,
}

struct VectorCandidate {
    job: Job,
    cosine_similarity: f32,
}

/// Fetches up to `CANDIDATE_SET_SIZE` active jobs ordered by cosine
/// similarity to `embedding`, above `SIMILARITY_FLOOR`. One query covers
/// the whole retrieval step; filtering happens in memory after.
async fn vector_candidates(pool: &PgPool, embedding: &pgvector::Vector) -> Result<Vec<VectorCandidate>, AppError> {
    let rows = sqlx::query(
        "SELECT *, 1 - (embedding <=> $1) AS cosine_similarity
         FROM jobs
         WHERE is_active AND embedding IS NOT NULL AND 1 - (embedding <=> $1) >= $2
         ORDER BY embedding <=> $1
         LIMIT $3",
    )
    .bind(embedding)
    .bind(SIMILARITY_FLOOR)
    .bind(CANDIDATE_SET_SIZE)
    .fetch_all(pool)
    .await?;

    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let job: Job = sqlx::FromRow::from_row(&row)?;
        let cosine_similarity: f64 = row.try_get("cosine_similarity")?;
        candidates.push(VectorCandidate {
            job,
            cosine_similarity: cosine_similarity as f32,
        });
    }
    Ok(candidates)
}

async fn active_job_count(pool: &PgPool) -> Result<i64, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM jobs WHERE is_active")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("count")?)
}

fn employment_type_allowed(job_employment_type: Option<&str>, candidate_role_types: &[String]) -> bool {
    if candidate_role_types.is_empty() {
        return true;
    }
    let Some(job_type) = job_employment_type else {
        return true;
    };
    let mapped = match job_type {
        "full_time" => "permanent",
        other => other,
    };
    candidate_role_types.iter().any(|t| t == mapped || t == job_type)
}

fn passes_hard_filters(job: &Job, candidate: &CandidateProfile) -> bool {
    if !candidate.role_families.is_empty() && !candidate.role_families.contains(&job.role_family) {
        return false;
    }
    if let (Some(candidate_seniority), Some(job_seniority)) = (&candidate.seniority, &job.seniority)
        && !seniority::within_one_step(candidate_seniority, job_seniority)
    {
        return false;
    }
    if !candidate.location_types.is_empty()
        && let Some(location_type) = &job.location_type
        && !candidate.location_types.contains(location_type)
    {
        return false;
    }
    if let (Some(min_salary), Some(job_max_salary)) = (candidate.min_salary, job.max_salary)
        && job_max_salary < min_salary
    {
        return false;
    }
    if !employment_type_allowed(job.employment_type.as_deref(), &candidate.role_types) {
        return false;
    }
    job.is_active
}

struct ScoreBreakdown {
    total: f32,
    reasons: Value,
}

fn score_job(job: &Job, cosine_similarity: f32, candidate: &CandidateProfile) -> ScoreBreakdown {
    let mut total = 0.0;
    let mut reasons = serde_json::Map::new();

    let semantic = cosine_similarity.clamp(0.0, 1.0);
    total += semantic * WEIGHT_SEMANTIC;
    reasons.insert(
        "semantic_similarity".to_string(),
        json!({ "signal": semantic, "detail": format!("{:.0}% semantic match", semantic * 100.0) }),
    );

    if !candidate.role_families.is_empty() {
        let role_signal = if candidate.role_families.contains(&job.role_family) {
            1.0
        } else if candidate
            .role_families
            .iter()
            .any(|f| role_families_adjacent(f, &job.role_family))
        {
            0.5
        } else {
            0.0
        };
        if role_signal > 0.0 {
            total += role_signal * WEIGHT_ROLE_FAMILY;
            reasons.insert(
                "role_family".to_string(),
                json!({ "signal": role_signal, "detail": format!("role family: {}", job.role_family) }),
            );
        }
    } else {
        let role_signal = 0.5;
        total += role_signal * WEIGHT_ROLE_FAMILY;
        reasons.insert(
            "role_family".to_string(),
            json!({ "signal": role_signal, "detail": "no role family preference stated" }),
        );
    }

    if let (Some(candidate_seniority), Some(job_seniority)) = (&candidate.seniority, &job.seniority) {
        let seniority_signal = if candidate_seniority == job_seniority {
            1.0
        } else if seniority::within_one_step(candidate_seniority, job_seniority) {
            0.5
        } else {
            0.0
        };
        if seniority_signal > 0.0 {
            total += seniority_signal * WEIGHT_SENIORITY;
            reasons.insert(
                "seniority".to_string(),
                json!({ "signal": seniority_signal, "detail": format!("seniority: {}", job_seniority) }),
            );
        }
    }

    if !job.skills.is_empty() {
        let overlap = candidate
            .skills
            .iter()
            .filter(|s| job.skills.contains(s))
            .count();
        let skill_signal = overlap as f32 / (job.skills.len().max(1) as f32);
        if skill_signal > 0.0 {
            total += skill_signal * WEIGHT_SKILLS;
            reasons.insert(
                "skill_overlap".to_string(),
                json!({ "signal": skill_signal, "detail": format!("{overlap} of {} required skills", job.skills.len()) }),
            );
        }
    }

    let freshness_signal = job.freshness_score.clamp(0.0, 1.0);
    total += freshness_signal * WEIGHT_FRESHNESS;
    reasons.insert(
        "freshness".to_string(),
        json!({ "signal": freshness_signal, "detail": "posting recency" }),
    );

    if let Some(min_salary) = candidate.min_salary {
        let salary_signal = match job.max_salary {
            Some(max_salary) if max_salary >= min_salary => 1.0,
            Some(_) => 0.0,
            None => 0.0,
        };
        if salary_signal > 0.0 {
            total += salary_signal * WEIGHT_SALARY;
            reasons.insert(
                "salary_fit".to_string(),
                json!({ "signal": salary_signal, "detail": "within candidate's minimum salary" }),
            );
        }
    }

    ScoreBreakdown {
        total: total.clamp(0.0, 1.0),
        reasons: Value::Object(reasons),
    }
}

/// Runs the full match pipeline for one candidate: retrieval, hard
/// filters, soft scoring, and persistence. A candidate with no embedding
/// yet produces `NoVectorCandidates`.
pub async fn match_candidate(pool: &PgPool, candidate: &CandidateProfile) -> Result<MatchOutcome, AppError> {
    let Some(embedding) = &candidate.embedding else {
        return Ok(MatchOutcome {
            matched: Vec::new(),
            no_match_reason: Some(NoMatchReason::NoVectorCandidates),
        });
    };

    let vector_candidates = vector_candidates(pool, embedding).await?;
    if vector_candidates.is_empty() {
        let reason = if active_job_count(pool).await? == 0 {
            NoMatchReason::EmptyCatalog
        } else {
            NoMatchReason::NoVectorCandidates
        };
        return Ok(MatchOutcome { matched: Vec::new(), no_match_reason: Some(reason) });
    }

    let filtered: Vec<&VectorCandidate> = vector_candidates
        .iter()
        .filter(|c| passes_hard_filters(&c.job, candidate))
        .collect();

    if filtered.is_empty() {
        return Ok(MatchOutcome {
            matched: Vec::new(),
            no_match_reason: Some(NoMatchReason::AllFilteredHard),
        });
    }

    let mut matched = Vec::new();
    for candidate_job in filtered {
        let breakdown = score_job(&candidate_job.job, candidate_job.cosine_similarity, candidate);
        let record = MatchRecord::upsert(
            pool,
            candidate.id,
            candidate_job.job.id,
            breakdown.total,
            true,
            breakdown.reasons,
        )
        .await?;
        matched.push(record);
    }

    if matched.is_empty() {
        return Ok(MatchOutcome {
            matched,
            no_match_reason: Some(NoMatchReason::AllFilteredScore),
        });
    }

    CandidateProfile::mark_matched(pool, candidate.id).await?;
    Ok(MatchOutcome { matched, no_match_reason: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_role_families_are_symmetric() {
        assert!(role_families_adjacent("software_engineering", "engineering_management"));
        assert!(role_families_adjacent("engineering_management", "software_engineering"));
        assert!(!role_families_adjacent("sales", "devops_sre"));
    }

    #[test]
    fn employment_type_empty_candidate_preference_matches_anything() {
        assert!(employment_type_allowed(Some("contract"), &[]));
    }

    #[test]
    fn employment_type_maps_full_time_to_permanent() {
        assert!(employment_type_allowed(
            Some("full_time"),
            &["permanent".to_string()]
        ));
    }
}
