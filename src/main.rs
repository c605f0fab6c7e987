mod auth;
mod config;
mod db;
mod detector;
mod discovery;
mod embedder;
mod error;
mod extractors;
mod fetcher;
mod maintenance;
mod matcher;
mod models;
mod normalizer;
mod orchestrator;
mod routes;
mod scheduler;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::orchestrator::registry::RunRegistry;
use crate::scheduler::Scheduler;
use crate::state::AppState;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: PgPool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catalogmesh=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    let reconciled = RunRegistry::reconcile_orphaned(&pool).await?;
    if reconciled > 0 {
        tracing::warn!("Reconciled {reconciled} orphaned pipeline run(s) from a previous process");
    }

    let config = Arc::new(config);
    let fetcher = Arc::new(Fetcher::new(&config.crawl_user_agent, config.render_service_url.clone()));
    let registry = Arc::new(RunRegistry::new());
    let scheduler = Scheduler::new(pool.clone(), fetcher.clone(), config.clone(), registry.clone());

    let state = AppState {
        pool: pool.clone(),
        fetcher,
        config: config.clone(),
        registry,
        scheduler: scheduler.clone(),
    };

    scheduler.start(Some(config.default_crawl_interval_hours)).await;

    let readyz_pool = pool.clone();
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(move || readyz(readyz_pool.clone())))
        .merge(routes::api::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
