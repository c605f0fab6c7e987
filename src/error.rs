use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced across the HTTP boundary.
///
/// Pipeline-internal failures (fetch, extraction, normalization) have their
/// own narrower error types and are converted into `AppError` only where
/// they need to cross into a handler response or abort a whole stage — see
/// `fetcher::FetchError` and `StageError` below.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                if let sqlx::Error::Database(db_err) = e
                    && db_err.is_unique_violation()
                {
                    return (
                        StatusCode::CONFLICT,
                        Json(json!({ "detail": "Resource already exists" })),
                    )
                        .into_response();
                }
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Cancelled => (StatusCode::CONFLICT, "Operation cancelled".to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

/// Terminal outcome of one unit of pipeline work (one URL, one job, one
/// candidate). Unlike `AppError`, a `StageError` never aborts the stage it
/// occurred in — the orchestrator logs it against the run and moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StageError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http 4xx: {0}")]
    HttpClientError(String),
    #[error("http 5xx: {0}")]
    HttpServerError(String),
    #[error("rate limited")]
    RateLimited,
    #[error("robots.txt denied")]
    RobotsDenied,
    #[error("render timeout")]
    RenderTimeout,
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("not found")]
    NotFound,
}

impl StageError {
    /// Kinds that must never be retried for the same URL/job.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StageError::HttpClientError(_) | StageError::RobotsDenied | StageError::NotFound
        )
    }
}
