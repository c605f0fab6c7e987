use async_trait::async_trait;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::models::candidate::CandidateProfile;
use crate::models::job::Job;

/// Rows are embedded `BATCH_SIZE` at a time to bound request payload size
/// and keep a single slow upstream call from stalling the whole backlog.
const BATCH_SIZE: usize = 32;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Calls an HTTP embedding service that accepts `{"inputs": [...]}` and
/// returns `{"embeddings": [[f32; dim]]}`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_url: String,
}

impl HttpEmbedder {
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&EmbedRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "embedding service returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("malformed embedding response: {e}")))?;
        Ok(parsed.embeddings)
    }
}

/// Deterministic hash-based embedder with no external dependency, used in
/// tests and local runs where `EMBEDDING_API_URL` is unset.
pub struct DeterministicEmbedder {
    dim: usize,
}

impl DeterministicEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts.iter().map(|t| hash_vector(t, self.dim)).collect())
    }
}

fn hash_vector(text: &str, dim: usize) -> Vec<f32> {
    use std::hash::{Hash, Hasher};
    let mut vector = vec![0.0_f32; dim];
    for (i, word) in text.split_whitespace().enumerate() {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        word.hash(&mut hasher);
        (i as u64).hash(&mut hasher);
        let slot = (hasher.finish() as usize) % dim;
        vector[slot] += 1.0;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

pub fn build_embedder(config: &Config) -> Box<dyn Embedder> {
    match &config.embedding_api_url {
        Some(url) => Box::new(HttpEmbedder::new(url.clone())),
        None => Box::new(DeterministicEmbedder::new(config.embedding_dim)),
    }
}

/// Input text for a job's embedding: title, location signal, skills, then
/// as much of the description as fits, in that priority order.
pub fn job_embedding_text(job: &Job) -> String {
    let mut parts = vec![job.title.clone()];
    if let Some(location_type) = &job.location_type {
        parts.push(location_type.clone());
    }
    parts.extend(job.locations.iter().cloned());
    parts.extend(job.skills.iter().cloned());
    parts.join(" ")
}

/// Input text for a candidate's embedding: declared role families and
/// seniority, then skills, then any free-form profile text.
pub fn candidate_embedding_text(candidate: &CandidateProfile) -> String {
    let mut parts = candidate.role_families.clone();
    if let Some(seniority) = &candidate.seniority {
        parts.push(seniority.clone());
    }
    parts.extend(candidate.skills.iter().cloned());
    if let Some(profile_text) = &candidate.profile_text {
        parts.push(profile_text.clone());
    }
    parts.join(" ")
}

/// Embeds every job missing a vector, `BATCH_SIZE` at a time. Returns the
/// number of jobs embedded.
pub async fn embed_missing_jobs(pool: &PgPool, embedder: &dyn Embedder) -> Result<u32, AppError> {
    let mut embedded = 0;
    loop {
        let jobs = Job::missing_embedding(pool, BATCH_SIZE as i64).await?;
        if jobs.is_empty() {
            break;
        }
        let texts: Vec<String> = jobs.iter().map(job_embedding_text).collect();
        let vectors = embedder.embed(&texts).await?;
        for (job, vector) in jobs.iter().zip(vectors.into_iter()) {
            Job::set_embedding(pool, job.id, Vector::from(vector)).await?;
            embedded += 1;
        }
    }
    Ok(embedded)
}

/// Embeds every active candidate missing a vector, `BATCH_SIZE` at a time.
pub async fn embed_missing_candidates(pool: &PgPool, embedder: &dyn Embedder) -> Result<u32, AppError> {
    let mut embedded = 0;
    loop {
        let candidates = CandidateProfile::missing_embedding(pool, BATCH_SIZE as i64).await?;
        if candidates.is_empty() {
            break;
        }
        let texts: Vec<String> = candidates.iter().map(candidate_embedding_text).collect();
        let vectors = embedder.embed(&texts).await?;
        for (candidate, vector) in candidates.iter().zip(vectors.into_iter()) {
            CandidateProfile::set_embedding(pool, candidate.id, Vector::from(vector)).await?;
            embedded += 1;
        }
    }
    Ok(embedded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_embedder_is_reproducible() {
        let embedder = DeterministicEmbedder::new(16);
        let a = embedder.embed(&["rust backend engineer".to_string()]).await.unwrap();
        let b = embedder.embed(&["rust backend engineer".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn deterministic_embedder_normalizes_vectors() {
        let embedder = DeterministicEmbedder::new(16);
        let vectors = embedder.embed(&["one two three four".to_string()]).await.unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
