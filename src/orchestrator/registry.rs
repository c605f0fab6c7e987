use std::collections::HashMap;
use std::sync::Mutex;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::pipeline_run::{PipelineRun, RunStatus};

pub const FULL_PIPELINE: &str = "full_pipeline";

struct RunHandle {
    run_id: i32,
    cancel: CancellationToken,
}

/// Process-wide map of in-flight operations keyed by `operation_type`. The
/// database row (`pipeline_runs`) is the durable record; this map is the
/// live view used to enforce concurrency policy and route cancellation.
pub struct RunRegistry {
    inner: Mutex<HashMap<String, RunHandle>>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Startup reconciliation: any `pipeline_runs` row still `running` when
    /// the process starts belonged to a prior instance and is marked
    /// `failed`. Must run before the registry accepts new work.
    pub async fn reconcile_orphaned(pool: &PgPool) -> Result<u64, AppError> {
        PipelineRun::reconcile_orphaned(pool).await
    }

    /// Writes the durable row first, then inserts the registry entry, so a
    /// crash between the two never leaves an entry with no backing row.
    /// `full_pipeline` refuses to start while *any* other operation is in
    /// flight (it would otherwise race a standalone stage over the same
    /// companies); a standalone stage refuses to start while `full_pipeline`
    /// is running, or while another run of the same `operation_type` is.
    pub async fn start(
        &self,
        pool: &PgPool,
        operation_type: &str,
        cascade: bool,
    ) -> Result<(i32, CancellationToken), AppError> {
        {
            let guard = self.inner.lock().unwrap();
            if operation_type == FULL_PIPELINE {
                if !guard.is_empty() {
                    return Err(AppError::Conflict(
                        "full_pipeline cannot start while another operation is running".to_string(),
                    ));
                }
            } else {
                if guard.contains_key(FULL_PIPELINE) {
                    return Err(AppError::Conflict("full_pipeline is already running".to_string()));
                }
                if guard.contains_key(operation_type) {
                    return Err(AppError::Conflict(format!("{operation_type} is already running")));
                }
            }
        }

        let run = PipelineRun::start(pool, operation_type, cascade).await?;
        let cancel = CancellationToken::new();

        let mut guard = self.inner.lock().unwrap();
        guard.insert(operation_type.to_string(), RunHandle { run_id: run.id, cancel: cancel.clone() });
        Ok((run.id, cancel))
    }

    pub async fn finish(&self, pool: &PgPool, operation_type: &str, status: RunStatus, error: Option<&str>) -> Result<(), AppError> {
        let run_id = {
            let mut guard = self.inner.lock().unwrap();
            guard.remove(operation_type).map(|h| h.run_id)
        };
        if let Some(run_id) = run_id {
            PipelineRun::finish(pool, run_id, status, error).await?;
        }
        Ok(())
    }

    pub fn is_running(&self, operation_type: &str) -> bool {
        self.inner.lock().unwrap().contains_key(operation_type)
    }

    pub fn running_operations(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }

    /// Signals cancellation for an in-flight operation; returns `false` if
    /// nothing with that name is running.
    pub fn cancel(&self, operation_type: &str) -> bool {
        let guard = self.inner.lock().unwrap();
        match guard.get(operation_type) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_operations_starts_empty() {
        let registry = RunRegistry::new();
        assert!(registry.running_operations().is_empty());
    }

    #[test]
    fn cancel_on_unknown_operation_returns_false() {
        let registry = RunRegistry::new();
        assert!(!registry.cancel("discovery"));
    }
}
