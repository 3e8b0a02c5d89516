//! Core types for newsnode

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a background job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random JobId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
///
/// Statuses only move forward: queued, running, then one of done or error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Dispatched, not started yet
    Queued,
    /// Work in progress
    Running,
    /// Finished successfully
    Done,
    /// Finished with an error
    Error,
}

impl JobStatus {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` keeps the walk monotonic
    ///
    /// Re-applying the same status is allowed (message updates). A terminal
    /// status never changes again.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked background job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job id
    pub id: JobId,
    /// Source name, or a label for non-source jobs ("analysis", "aggregate")
    pub source: String,
    /// Current status
    pub status: JobStatus,
    /// Last status message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// First time this job was seen
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a best-effort multi-step operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every step succeeded
    Ok,
    /// Some steps fell back or failed, a result was still produced
    Partial,
    /// Nothing usable was produced
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunStatus::Ok => "ok",
            RunStatus::Partial => "partial",
            RunStatus::Error => "error",
        })
    }
}

/// Kind of source an article came from
///
/// Each fetchable kind resolves to a parser/normalizer pair through
/// [`crate::fetch::SourceAdapter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// RSS 2.0 or Atom feed
    #[default]
    Rss,
    /// JSON API returning an article array
    Json,
    /// HTML listing page
    Html,
    /// GDELT DOC API
    Gdelt,
    /// Saved directly through the API
    Manual,
    /// Unrecognized type from a persisted override
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Rss => "rss",
            SourceType::Json => "json",
            SourceType::Html => "html",
            SourceType::Gdelt => "gdelt",
            SourceType::Manual => "manual",
            SourceType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A raw/local article
///
/// `url` is the dedup key in the local store. `id` is assigned once and
/// survives overwrites through [`crate::store::ArticleStore::add`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Stable article id
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Canonical article URL
    pub url: String,
    /// Headline
    #[serde(default)]
    pub title: String,
    /// Full text, empty until resolved
    #[serde(default)]
    pub content: String,
    /// Short summary
    #[serde(default)]
    pub summary: String,
    /// Topic tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication time
    #[serde(default = "Utc::now")]
    pub published_at: DateTime<Utc>,
    /// Time the node fetched the article
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
    /// Source name
    #[serde(default)]
    pub source: String,
    /// Source kind
    #[serde(default)]
    pub source_type: SourceType,
    /// Source category
    #[serde(default)]
    pub category: String,
    /// Byline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISO 639-1 language code
    #[serde(default = "default_language")]
    pub language: String,
    /// Whether AI analysis ran on this record
    #[serde(default)]
    pub analyzed: bool,
    /// Content hash in the blob store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
    /// Source-specific extras
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub source_meta: Option<serde_json::Value>,
}

/// Host part of `url`, used as a source name when none is given
pub fn url_host(url: &str) -> Option<String> {
    url::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Language assumed when a source or client does not say
pub fn default_language() -> String {
    "en".to_string()
}

impl Article {
    /// Create an empty draft for `url` with fresh id and timestamps
    pub fn draft(url: impl Into<String>, source: impl Into<String>, source_type: SourceType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: String::new(),
            content: String::new(),
            summary: String::new(),
            tags: vec![],
            published_at: now,
            fetched_at: now,
            source: source.into(),
            source_type,
            category: String::new(),
            author: None,
            language: default_language(),
            analyzed: false,
            ipfs_hash: None,
            source_meta: None,
        }
    }

    /// Take freshly resolved content into this stored record
    ///
    /// Everything the pipeline stored stays; content is replaced, the content
    /// hash is taken when the resolver found one and the title only fills a gap.
    pub fn absorb_resolved(&mut self, resolved: Article) {
        self.content = resolved.content;
        if resolved.ipfs_hash.is_some() {
            self.ipfs_hash = resolved.ipfs_hash;
        }
        if self.title.trim().is_empty() {
            self.title = resolved.title;
        }
        self.fetched_at = resolved.fetched_at;
    }

    /// Check the fields every stored article must carry
    pub fn validate(&self) -> std::result::Result<(), String> {
        match url::Url::parse(&self.url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => return Err(format!("url scheme '{}' is not http(s)", u.scheme())),
            Err(e) => return Err(format!("url '{}' is not absolute: {}", self.url, e)),
        }
        if self.title.trim().is_empty() {
            return Err(format!("article {} has an empty title", self.url));
        }
        if self.source.trim().is_empty() {
            return Err(format!("article {} has no source", self.url));
        }
        if self.language.trim().is_empty() {
            return Err(format!("article {} has no language", self.url));
        }
        Ok(())
    }
}

/// An article enriched by the AI backend
///
/// `article.id` is a fresh id. `original_id` points back at the local record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAnalyzed {
    /// The enriched article (`analyzed` is always true)
    #[serde(flatten)]
    pub article: Article,
    /// Id of the local article this was derived from
    pub original_id: Uuid,
    /// Political bias result
    #[serde(default)]
    pub political_bias: serde_json::Value,
    /// Sentiment result
    #[serde(default)]
    pub sentiment: serde_json::Value,
    /// Cognitive bias result
    #[serde(default)]
    pub cognitive_biases: serde_json::Value,
    /// Counter-argument
    #[serde(default)]
    pub antithesis: serde_json::Value,
    /// Philosophical reading
    #[serde(default)]
    pub philosophical: serde_json::Value,
    /// When analysis finished
    pub analysis_timestamp: DateTime<Utc>,
}

/// Pointer to an article replicated from a peer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFederated {
    /// Content identifier (dedup key)
    pub cid: String,
    /// Article URL
    pub url: String,
    /// Headline
    #[serde(default)]
    pub title: String,
    /// Source name
    #[serde(default)]
    pub source: String,
    /// Publication time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Debug log severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational
    #[default]
    Info,
    /// Something degraded
    Warn,
    /// Something failed
    Error,
}

/// One entry of the application debug log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DebugLogEntry {
    /// Entry id
    pub id: Uuid,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Message text
    pub message: String,
    /// Severity
    pub level: LogLevel,
    /// Arbitrary structured context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<serde_json::Value>,
}

/// Event delivered to live subscribers
///
/// Serialized with a `type` tag carrying the wire event name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum Event {
    /// A source fetch started
    #[serde(rename = "source:fetch:start")]
    FetchStart {
        /// Source name
        source: String,
        /// Requested endpoint
        endpoint: String,
    },

    /// One item of a source was normalized
    #[serde(rename = "source:fetch:progress")]
    FetchProgress {
        /// Source name
        source: String,
        /// 1-based item index
        index: usize,
        /// Items parsed from the payload
        total: usize,
    },

    /// A source fetch finished
    #[serde(rename = "source:fetch:done")]
    FetchDone {
        /// Source name
        source: String,
        /// Valid articles produced
        count: usize,
    },

    /// A source fetch failed
    #[serde(rename = "source:fetch:error")]
    FetchError {
        /// Source name
        source: String,
        /// Requested endpoint
        endpoint: String,
        /// Error message
        message: String,
    },

    /// A job changed status
    #[serde(rename = "job-status")]
    JobStatus {
        /// Job id
        #[serde(rename = "jobId")]
        job_id: JobId,
        /// Job source label
        source: String,
        /// New status
        status: JobStatus,
        /// Status message
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// An AI task finished for an article
    #[serde(rename = "ai-status")]
    AiStatus {
        /// Article being analyzed
        #[serde(rename = "articleId")]
        article_id: Uuid,
        /// Article source
        source: String,
        /// Backend task name
        task: String,
        /// Task outcome
        status: RunStatus,
        /// Failure message
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A debug log entry was appended
    #[serde(rename = "debug-log")]
    DebugLog {
        /// The new entry
        entry: DebugLogEntry,
    },
}
