use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::orchestrator::registry::RunRegistry;
use crate::scheduler::Scheduler;

/// Shared state for routes that need more than a database handle: the
/// admin/pipeline surface and anything that triggers a mutation needing
/// the fetcher, config, run registry, or scheduler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub fetcher: Arc<Fetcher>,
    pub config: Arc<Config>,
    pub registry: Arc<RunRegistry>,
    pub scheduler: Arc<Scheduler>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
