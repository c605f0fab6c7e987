pub mod admin;
pub mod candidates;
pub mod jobs;
pub mod tokens;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};

use crate::auth::{require_admin_token, require_write_token};
use crate::state::AppState;

/// Read-only endpoints are open. Job/candidate mutations and token
/// management accept a `write`-scoped token; the pipeline/discovery/
/// scheduler admin surface requires an `admin`-scoped one.
pub fn router(state: AppState) -> Router {
    let reads = Router::new()
        .route("/jobs", get(jobs::list))
        .route("/jobs/{id}", get(jobs::get))
        .route("/candidates/{id}", get(candidates::get))
        .route("/candidates/{id}/matches", get(candidates::matches))
        .with_state(state.pool.clone());

    let writes = Router::new()
        .route("/jobs/{id}/click", post(jobs::click))
        .route("/candidates/{id}", axum::routing::patch(candidates::update))
        .route("/candidates/sync-from-waitlist", post(candidates::sync_from_waitlist))
        .route("/tokens", get(tokens::list).post(tokens::create))
        .route("/tokens/{id}", delete(tokens::revoke))
        .layer(middleware::from_fn_with_state::<_, _, (axum::extract::State<sqlx::PgPool>, axum::extract::Request)>(
            state.pool.clone(),
            require_write_token,
        ))
        .with_state(state.pool.clone());

    let admin_routes = Router::new()
        .route("/admin/analytics", get(admin::analytics))
        .route("/admin/pipeline/status", get(admin::pipeline_status))
        .route("/admin/pipeline/run", post(admin::run_pipeline))
        .route("/admin/pipeline/crawl", post(admin::run_crawl))
        .route("/admin/pipeline/enrich", post(admin::run_enrich))
        .route("/admin/pipeline/embeddings", post(admin::run_embeddings))
        .route("/admin/discovery/run", post(admin::run_discovery))
        .route("/admin/discovery/process-queue", post(admin::process_discovery_queue))
        .route("/admin/scheduler/start", post(admin::start_scheduler))
        .route("/admin/scheduler/stop", post(admin::stop_scheduler))
        .layer(middleware::from_fn_with_state(state.pool.clone(), require_admin_token))
        .with_state(state);

    Router::new().nest("/api", reads.merge(writes).merge(admin_routes))
}
