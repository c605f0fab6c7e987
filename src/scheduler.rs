use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::orchestrator::pipeline::{self, PipelineFlags};
use crate::orchestrator::registry::{FULL_PIPELINE, RunRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_hours: u64,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}

/// A single-driver periodic trigger. Start/stop are no-ops when already in
/// the requested state. Each tick kicks off a full pipeline run unless one
/// is already in flight, in which case the tick is skipped and logged.
pub struct Scheduler {
    pool: PgPool,
    fetcher: Arc<Fetcher>,
    config: Arc<Config>,
    registry: Arc<RunRegistry>,
    running: AtomicBool,
    interval_hours: AtomicI64,
    next_run: Mutex<Option<DateTime<Utc>>>,
    last_run: Mutex<Option<DateTime<Utc>>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(pool: PgPool, fetcher: Arc<Fetcher>, config: Arc<Config>, registry: Arc<RunRegistry>) -> Arc<Self> {
        let interval_hours = config.default_crawl_interval_hours as i64;
        Arc::new(Self {
            pool,
            fetcher,
            config,
            registry,
            running: AtomicBool::new(false),
            interval_hours: AtomicI64::new(interval_hours),
            next_run: Mutex::new(None),
            last_run: Mutex::new(None),
            handle: Mutex::new(None),
        })
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            interval_hours: self.interval_hours.load(Ordering::SeqCst) as u64,
            next_run: *self.next_run.lock().await,
            last_run: *self.last_run.lock().await,
        }
    }

    /// No-op if already running.
    pub async fn start(self: &Arc<Self>, interval_hours: Option<u64>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(hours) = interval_hours {
            self.interval_hours.store(hours as i64, Ordering::SeqCst);
        }

        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move { scheduler.drive().await });
        *self.handle.lock().await = Some(handle);
    }

    /// No-op if already stopped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
        *self.next_run.lock().await = None;
    }

    async fn drive(self: Arc<Self>) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }

            let interval = Duration::from_secs(self.interval_hours.load(Ordering::SeqCst) as u64 * 3600);
            *self.next_run.lock().await = Some(Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default());
            tokio::time::sleep(interval).await;

            if !self.running.load(Ordering::SeqCst) {
                return;
            }

            if self.registry.is_running(FULL_PIPELINE) {
                tracing::info!("scheduler tick skipped: full_pipeline already in flight");
                continue;
            }

            tracing::info!("scheduler tick: starting full pipeline run");
            let _ = pipeline::run_full_pipeline(&self.pool, &self.fetcher, &self.config, &self.registry, PipelineFlags::default()).await;
            *self.last_run.lock().await = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stopped_scheduler_reports_not_running() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/does_not_matter").unwrap();
        let config = Arc::new(Config {
            database_url: String::new(),
            listen_addr: "0.0.0.0:0".to_string(),
            run_migrations: false,
            crawl_user_agent: "test".to_string(),
            max_concurrent_workers: 1,
            default_crawl_interval_hours: 6,
            embedding_dim: 384,
            embedding_model_version: "v1".to_string(),
            embedding_api_url: None,
            llm_model: "test".to_string(),
            llm_api_key: None,
            llm_api_base: None,
            render_service_url: None,
            verify_refresh_days: 7,
        });
        let fetcher = Arc::new(Fetcher::new("test", None));
        let registry = Arc::new(RunRegistry::new());
        let scheduler = Scheduler::new(pool, fetcher, config, registry);
        let status = scheduler.status().await;
        assert!(!status.running);
    }
}
