use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Firecrawl
    pub firecrawl_api_key: String,

    // LLM (OpenAI-compatible)
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,

    // Search execution
    pub max_concurrent_searches: usize,
    pub fetch_timeout_secs: u64,

    // Decomposition cache
    pub decomposition_cache_ttl_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            firecrawl_api_key: required_env("FIRECRAWL_API_KEY"),
            openai_api_key: required_env("OPENAI_API_KEY"),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            max_concurrent_searches: env::var("MAX_CONCURRENT_SEARCHES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("MAX_CONCURRENT_SEARCHES must be a number"),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("FETCH_TIMEOUT_SECS must be a number"),
            decomposition_cache_ttl_hours: env::var("DECOMPOSITION_CACHE_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("DECOMPOSITION_CACHE_TTL_HOURS must be a number"),
        }
    }
}

impl Config {
    /// Log the loaded configuration without secrets.
    pub fn log_redacted(&self) {
        tracing::info!(
            openai_base_url = %self.openai_base_url,
            openai_model = %self.openai_model,
            max_concurrent_searches = self.max_concurrent_searches,
            fetch_timeout_secs = self.fetch_timeout_secs,
            decomposition_cache_ttl_hours = self.decomposition_cache_ttl_hours,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
