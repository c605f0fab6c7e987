use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::error::AppError;

/// `write` tokens cover job/candidate mutation routes; `admin` additionally
/// covers the pipeline/discovery/scheduler surface. An admin token satisfies
/// a write check; a write token never satisfies an admin check.
const SCOPE_ADMIN: &str = "admin";

/// Hash a raw API token for storage/lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new random API token.
pub fn generate_token() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

async fn authorize(pool: &PgPool, request: &Request, required_scope: &str) -> Result<String, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let token_hash = hash_token(token);

    let row: Option<(String,)> = sqlx::query_as(
        "SELECT scope FROM api_tokens WHERE token_hash = $1 AND (expires_at IS NULL OR expires_at > NOW())",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let scope = row.map(|r| r.0).ok_or(AppError::Unauthorized)?;
    if required_scope == SCOPE_ADMIN && scope != SCOPE_ADMIN {
        return Err(AppError::Unauthorized);
    }

    Ok(token_hash)
}

fn touch_last_used(pool: PgPool, token_hash: String) {
    tokio::spawn(async move {
        let _ = sqlx::query("UPDATE api_tokens SET last_used = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&pool)
            .await;
    });
}

/// Guards job/candidate mutation routes: accepts a `write` or `admin` token.
pub async fn require_write_token(State(pool): State<PgPool>, request: Request, next: Next) -> Result<Response, AppError> {
    let token_hash = authorize(&pool, &request, "write").await?;
    touch_last_used(pool, token_hash);
    Ok(next.run(request).await)
}

/// Guards the pipeline/discovery/scheduler admin surface: accepts only an
/// `admin`-scoped token.
pub async fn require_admin_token(State(pool): State<PgPool>, request: Request, next: Next) -> Result<Response, AppError> {
    let token_hash = authorize(&pool, &request, SCOPE_ADMIN).await?;
    touch_last_used(pool, token_hash);
    Ok(next.run(request).await)
}
