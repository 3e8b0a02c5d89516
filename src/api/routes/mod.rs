//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`sources`] - Source registry
//! - [`articles`] - Fetching and the local article store
//! - [`analyzed`] - AI-analyzed articles
//! - [`federated`] - Federated pointers and aggregation
//! - [`debug`] - Application debug log
//! - [`jobs`] - Background job status
//! - [`system`] - Health, events, OpenAPI

use crate::fetch::FetchOptions;
use crate::sources::Source;
use crate::types::{Article, JobId, JobStatus, LogLevel};
use serde::{Deserialize, Serialize};

mod analyzed;
mod articles;
mod debug;
mod federated;
mod jobs;
mod sources;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use analyzed::*;
pub use articles::*;
pub use debug::*;
pub use federated::*;
pub use jobs::*;
pub use sources::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /sources
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSourcesQuery {
    /// Attach per-source article statistics
    #[serde(default)]
    pub with_meta: bool,
}

/// Query parameters for GET /articles/fetch and GET /articles/fetch/:source
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    /// Translation target language (defaults to the configured one)
    pub language: Option<String>,
    /// Skip title translation
    #[serde(default)]
    pub skip_translation: bool,
}

impl FetchQuery {
    pub(crate) fn into_options(self) -> FetchOptions {
        FetchOptions {
            target_language: self.language.filter(|l| !l.trim().is_empty()),
            skip_translation: self.skip_translation,
            ..Default::default()
        }
    }
}

/// Request body for POST /articles/local/fetch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LocalFetchRequest {
    /// Sources to fetch, registered or not
    pub sources: Vec<Source>,
    /// Fetch options
    #[serde(default)]
    pub options: FetchOptions,
}

/// Query parameters for GET /articles/local
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ListArticlesQuery {
    /// Only articles from this source
    pub source: Option<String>,
    /// Maximum number of articles, newest first
    pub limit: Option<usize>,
}

/// Query parameters for GET /articles/local/full
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FullArticleQuery {
    /// Article id
    pub id: Option<uuid::Uuid>,
    /// Content id
    pub cid: Option<String>,
    /// Article url
    pub url: Option<String>,
}

/// Request body for POST /articles/local/save
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SaveArticleRequest {
    /// Article to store
    #[serde(flatten)]
    pub article: Article,
    /// Replace an existing record with the same url
    #[serde(default)]
    pub overwrite: bool,
}

/// Request body for POST /articles/local/refetch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RefetchRequest {
    /// Articles to add; existing urls are skipped
    pub articles: Vec<Article>,
}

/// Query parameters for GET /articles/analyzed and /articles/analyzed/full
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnalyzedQuery {
    /// Analyzed id or local article id
    pub id: Option<uuid::Uuid>,
}

/// Request body for POST /articles/aggregate
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AggregateRequest {
    /// Provider endpoints (defaults to the configured providers)
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// Request body for POST /debug/log
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DebugLogRequest {
    /// Message text
    pub message: String,
    /// Severity (default: info)
    #[serde(default)]
    pub level: LogLevel,
    /// Structured context
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<serde_json::Value>,
}

/// Acknowledgement for a queued background job
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    /// Always true
    pub success: bool,
    /// Job to poll at /jobs/:id
    pub job_id: JobId,
    /// Always "queued"
    pub status: JobStatus,
}

impl QueuedResponse {
    pub(crate) fn new(job_id: JobId) -> Self {
        Self {
            success: true,
            job_id,
            status: JobStatus::Queued,
        }
    }
}
