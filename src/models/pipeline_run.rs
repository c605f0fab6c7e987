use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PipelineRun {
    pub id: i32,
    pub stage: String,
    pub status: String,
    pub processed: i32,
    pub failed: i32,
    pub current_step: Option<String>,
    pub progress: f32,
    pub cascade: bool,
    pub error: Option<String>,
    pub logs: Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Writes the durable row; the orchestrator's in-memory registry entry
    /// is only created after this succeeds, so a crash mid-start never
    /// leaves a registry entry with no backing row.
    pub async fn start(pool: &PgPool, stage: &str, cascade: bool) -> Result<PipelineRun, AppError> {
        let run = sqlx::query_as::<_, PipelineRun>(
            "INSERT INTO pipeline_runs (stage, cascade) VALUES ($1, $2) RETURNING *",
        )
        .bind(stage)
        .bind(cascade)
        .fetch_one(pool)
        .await?;
        Ok(run)
    }

    pub async fn update_progress(
        pool: &PgPool,
        id: i32,
        current_step: &str,
        progress: f32,
        processed: i32,
        failed: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE pipeline_runs SET current_step = $2, progress = $3, processed = $4, failed = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(current_step)
        .bind(progress)
        .bind(processed)
        .bind(failed)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn append_log(pool: &PgPool, id: i32, message: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE pipeline_runs SET logs = logs || jsonb_build_array(jsonb_build_object('at', NOW(), 'message', $2::text)) WHERE id = $1",
        )
        .bind(id)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn finish(
        pool: &PgPool,
        id: i32,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<PipelineRun, AppError> {
        let run = sqlx::query_as::<_, PipelineRun>(
            "UPDATE pipeline_runs SET status = $2, error = $3, progress = 1.0, completed_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .fetch_one(pool)
        .await?;
        Ok(run)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<PipelineRun, AppError> {
        sqlx::query_as::<_, PipelineRun>("SELECT * FROM pipeline_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pipeline run {id} not found")))
    }

    pub async fn recent(pool: &PgPool, stage: Option<&str>, limit: i64) -> Result<Vec<PipelineRun>, AppError> {
        let runs = sqlx::query_as::<_, PipelineRun>(
            "SELECT * FROM pipeline_runs WHERE ($1::text IS NULL OR stage = $1) ORDER BY started_at DESC LIMIT $2",
        )
        .bind(stage)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(runs)
    }

    /// Rows left `running` from a process that died mid-run. Called once at
    /// startup before the registry accepts new work.
    pub async fn reconcile_orphaned(pool: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE pipeline_runs SET status = 'failed', error = 'orphaned: process restarted mid-run', completed_at = NOW()
             WHERE status = 'running'",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub fn summary_json(&self) -> Value {
        json!({
            "id": self.id,
            "stage": self.stage,
            "status": self.status,
            "processed": self.processed,
            "failed": self.failed,
            "current_step": self.current_step,
            "progress": self.progress,
        })
    }
}
