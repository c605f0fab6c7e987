use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "catalogmesh", about = "Job ingestion and matching pipeline")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// User-Agent string sent on plain HTTP fetches
    #[arg(long, env = "CRAWL_USER_AGENT", default_value = "catalogmesh-bot/1.0")]
    pub crawl_user_agent: String,

    /// Worker pool size per pipeline stage
    #[arg(long, env = "MAX_CONCURRENT_WORKERS", default_value_t = 8)]
    pub max_concurrent_workers: usize,

    /// Default scheduler tick interval, in hours
    #[arg(long, env = "DEFAULT_CRAWL_INTERVAL_HOURS", default_value_t = 6)]
    pub default_crawl_interval_hours: u64,

    /// Embedding vector dimensionality
    #[arg(long, env = "EMBEDDING_DIM", default_value_t = 384)]
    pub embedding_dim: usize,

    /// Opaque version tag bumped whenever the embedding model changes
    #[arg(long, env = "EMBEDDING_MODEL_VERSION", default_value = "v1")]
    pub embedding_model_version: String,

    /// HTTP endpoint that accepts `{inputs: [String]}` and returns vectors
    #[arg(long, env = "EMBEDDING_API_URL")]
    pub embedding_api_url: Option<String>,

    /// Language model used by the custom-ATS extraction fallback
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// API key for the language-model completion endpoint
    #[arg(long, env = "LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Base URL for the language-model completion endpoint (OpenAI-compatible)
    #[arg(long, env = "LLM_API_BASE")]
    pub llm_api_base: Option<String>,

    /// Headless-browser rendering service base URL
    #[arg(long, env = "RENDER_SERVICE_URL")]
    pub render_service_url: Option<String>,

    /// Number of days an active job goes unverified before maintenance re-checks it
    #[arg(long, env = "VERIFY_REFRESH_DAYS", default_value_t = 7)]
    pub verify_refresh_days: i64,
}
