//! Configuration types for newsnode

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for a news node
///
/// Every field has a default, so `Config::default()` is a working local node
/// with no AI backend and no aggregation providers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Data storage locations
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Fetch pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// AI backend connection
    #[serde(default)]
    pub ai: AiConfig,

    /// Background job tracking
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Aggregation resolver behavior
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Event broadcasting
    #[serde(default)]
    pub events: EventsConfig,

    /// Debug log retention
    #[serde(default)]
    pub debug_log: DebugLogConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the node cannot run with
    ///
    /// A zero sweep interval or event channel capacity would panic inside
    /// tokio.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep interval must be greater than zero".to_string(),
                key: Some("jobs.sweep_interval".to_string()),
            });
        }
        if self.events.channel_capacity == 0 {
            return Err(Error::Config {
                message: "event channel capacity must be greater than zero".to_string(),
                key: Some("events.channel_capacity".to_string()),
            });
        }
        Ok(())
    }

    /// Apply environment-level overrides
    ///
    /// Recognized variables:
    /// - `NEWSNODE_TARGET_LANGUAGE` - translation target language
    /// - `NEWSNODE_AGGREGATION_TIMEOUT_MS` - per-article aggregation timeout
    /// - `NEWSNODE_JOB_RETENTION_MS` - retention window for finished jobs
    /// - `NEWSNODE_AI_URL` - AI backend base URL
    /// - `NEWSNODE_RATE_LIMIT_MAX` - requests allowed per window per IP
    /// - `NEWSNODE_RATE_LIMIT_WINDOW_MS` - rate limit window length
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(lang) = env_var("NEWSNODE_TARGET_LANGUAGE") {
            self.pipeline.target_language = Some(lang);
        }
        if let Some(ms) = env_u64("NEWSNODE_AGGREGATION_TIMEOUT_MS")? {
            self.aggregation.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("NEWSNODE_JOB_RETENTION_MS")? {
            self.jobs.retention = Duration::from_millis(ms);
        }
        if let Some(url) = env_var("NEWSNODE_AI_URL") {
            url::Url::parse(&url).map_err(|e| Error::Config {
                message: format!("invalid AI backend URL '{}': {}", url, e),
                key: Some("NEWSNODE_AI_URL".to_string()),
            })?;
            self.ai.base_url = Some(url);
        }
        if let Some(max) = env_u64("NEWSNODE_RATE_LIMIT_MAX")? {
            self.server.api.rate_limit.max_requests = max as u32;
        }
        if let Some(ms) = env_u64("NEWSNODE_RATE_LIMIT_WINDOW_MS")? {
            self.server.api.rate_limit.window = Duration::from_millis(ms);
        }
        self.validate()
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match env_var(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| Error::Config {
            message: format!("{} must be an unsigned integer, got '{}': {}", key, raw, e),
            key: Some(key.to_string()),
        }),
    }
}

/// Which document store backend to open
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file at `database_path`
    #[default]
    Sqlite,
    /// Process memory (lost on restart)
    Memory,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Document store backend (default: sqlite)
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database path (default: "newsnode.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Persisted source override list (default: "data/sources.json")
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,

    /// Content-addressable blob directory (default: "data/blobs")
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
            sources_path: default_sources_path(),
            blob_dir: default_blob_dir(),
        }
    }
}

/// Fetch pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Language titles are translated into (None = no translation)
    #[serde(default)]
    pub target_language: Option<String>,

    /// Skip title translation even when a target language is set
    #[serde(default)]
    pub skip_translation: bool,

    /// Per-request fetch timeout in milliseconds (default: 30000)
    #[serde(default = "default_fetch_timeout", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub fetch_timeout: Duration,

    /// User agent sent to sources
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cap on items taken from one source per fetch
    #[serde(default)]
    pub max_items_per_source: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_language: None,
            skip_translation: false,
            fetch_timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_items_per_source: None,
        }
    }
}

/// AI backend configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AiConfig {
    /// Base URL of the AI microservice (None = AI disabled)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-call timeout in milliseconds (default: 60000)
    #[serde(default = "default_ai_timeout", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// Retry behavior for transient AI failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_ai_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay in milliseconds (default: 500)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay in milliseconds (default: 10000)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Backoff multiplier (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Job tracker configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobsConfig {
    /// How long finished jobs stay visible, in milliseconds (default: 600000)
    #[serde(default = "default_job_retention", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub retention: Duration,

    /// How often the sweep runs, in milliseconds (default: 600000)
    #[serde(default = "default_sweep_interval", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention: default_job_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Aggregation resolver configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AggregationConfig {
    /// Per-article resolution timeout in milliseconds (default: 10000)
    #[serde(default = "default_aggregation_timeout", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// Provider endpoints returning article metadata lists
    #[serde(default)]
    pub providers: Vec<String>,

    /// Articles resolved concurrently (default: 8)
    #[serde(default = "default_aggregation_concurrency")]
    pub max_concurrent: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            timeout: default_aggregation_timeout(),
            providers: vec![],
            max_concurrent: default_aggregation_concurrency(),
        }
    }
}

/// Event broadcasting configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EventsConfig {
    /// Buffered events per live subscriber before it lags (default: 1000)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Debug log configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DebugLogConfig {
    /// Entries kept before the oldest are dropped (default: 1000)
    #[serde(default = "default_debug_log_capacity")]
    pub capacity: usize,
}

impl Default for DebugLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_debug_log_capacity(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:4000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration (fixed window per client IP)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per window per IP (default: 15)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds (default: 5000)
    #[serde(default = "default_rate_window", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub window: Duration,

    /// Endpoints exempt from rate limiting
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// IPs exempt from rate limiting
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window: default_rate_window(),
            exempt_paths: default_exempt_paths(),
            exempt_ips: vec![],
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("newsnode.db")
}

fn default_sources_path() -> PathBuf {
    PathBuf::from("data/sources.json")
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("newsnode/{}", env!("CARGO_PKG_VERSION"))
}

fn default_ai_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_job_retention() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_aggregation_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_aggregation_concurrency() -> usize {
    8
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_debug_log_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_requests() -> u32 {
    15
}

fn default_rate_window() -> Duration {
    Duration::from_secs(5)
}

fn default_exempt_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/events".to_string(),
        "/ws".to_string(),
    ]
}

// Durations travel as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
