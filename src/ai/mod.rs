//! Client for the external AI microservice
//!
//! The backend exposes one POST route per task. Every route answers with the
//! same envelope (`status`, `data`, `errors`, `meta`), see [`AiResponse`].
//! Calls are independent: a failing task never blocks another one.

use crate::config::{AiConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod analyze;

pub use analyze::{AnalysisOutcome, analyze_article};

/// Backend task, one per route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiTask {
    /// Sentiment label and score
    Sentiment,
    /// Political leaning
    PoliticalBias,
    /// Cognitive biases found in the text
    CognitiveBias,
    /// Counter-argument to the article
    Antithesis,
    /// Philosophical reading of the article
    Philosophical,
    /// Short summary
    Summarize,
    /// Translation into a target language
    Translate,
    /// Named-entity tags
    ExtractTags,
    /// HTML cleanup plus translation to English
    Normalize,
    /// ISO language code of the text
    DetectLanguage,
}

impl AiTask {
    /// Tasks every analysis runs
    pub const CORE: [AiTask; 5] = [
        AiTask::PoliticalBias,
        AiTask::Sentiment,
        AiTask::CognitiveBias,
        AiTask::Antithesis,
        AiTask::Philosophical,
    ];

    /// Route name on the backend
    pub fn path(&self) -> &'static str {
        match self {
            AiTask::Sentiment => "sentiment",
            AiTask::PoliticalBias => "political-bias",
            AiTask::CognitiveBias => "cognitive-bias",
            AiTask::Antithesis => "antithesis",
            AiTask::Philosophical => "philosophical",
            AiTask::Summarize => "summarize",
            AiTask::Translate => "translate",
            AiTask::ExtractTags => "extract-tags",
            AiTask::Normalize => "normalize",
            AiTask::DetectLanguage => "detect-language",
        }
    }
}

impl std::fmt::Display for AiTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Envelope status reported by the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    /// Model answered
    Ok,
    /// Task failed, `errors` says why
    Error,
    /// Model unavailable, `data` holds a heuristic answer
    Fallback,
}

/// Response envelope shared by every backend route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    /// Outcome of the task
    pub status: AiStatus,
    /// Task payload, shape depends on the task
    #[serde(default)]
    pub data: serde_json::Value,
    /// Error messages, `null` when there are none
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    /// Backend metadata (model name, timings)
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl AiResponse {
    /// Successful envelope around `data`
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: AiStatus::Ok,
            data,
            errors: None,
            meta: serde_json::Value::Null,
        }
    }

    /// Joined error messages
    pub fn error_message(&self) -> String {
        match &self.errors {
            Some(errors) if !errors.is_empty() => errors.join("; "),
            _ => "unknown error".to_string(),
        }
    }
}

/// Interface to the AI backend
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Run one text task
    ///
    /// An `error` envelope is returned as [`Error::Ai`]; `ok` and `fallback`
    /// envelopes are returned as-is.
    async fn run(&self, task: AiTask, text: &str) -> Result<AiResponse>;

    /// Translate `text` into `target_language`
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// [`AiBackend`] over HTTP
pub struct HttpAiBackend {
    client: reqwest::Client,
    base_url: url::Url,
    retry: RetryConfig,
}

impl HttpAiBackend {
    /// Create a client for the backend at `base_url`
    ///
    /// # Errors
    /// Returns a config error if `base_url` is not a valid URL, or if the HTTP
    /// client cannot be built
    pub fn new(base_url: &str, config: &AiConfig) -> Result<Self> {
        // A trailing slash keeps `join` from replacing the last path segment
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = url::Url::parse(&normalized).map_err(|e| Error::Config {
            message: format!("invalid AI backend url '{}': {}", base_url, e),
            key: Some("ai.base_url".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("newsnode/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry.clone(),
        })
    }

    /// Build the configured backend, or `None` when no base URL is set
    pub fn from_config(config: &AiConfig) -> Result<Option<Arc<dyn AiBackend>>> {
        match &config.base_url {
            Some(url) => Ok(Some(Arc::new(Self::new(url, config)?))),
            None => Ok(None),
        }
    }

    async fn post(&self, task: AiTask, body: serde_json::Value) -> Result<AiResponse> {
        let url = self
            .base_url
            .join(task.path())
            .map_err(|e| Error::Ai(format!("{}: bad route: {}", task, e)))?;

        with_retry(&self.retry, || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = client.post(url).json(&body).send().await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Ai(format!(
                        "{} returned HTTP {}",
                        task,
                        status.as_u16()
                    )));
                }

                let envelope: AiResponse = response.json().await?;
                match envelope.status {
                    AiStatus::Error => Err(Error::Ai(format!(
                        "{}: {}",
                        task,
                        envelope.error_message()
                    ))),
                    AiStatus::Fallback => {
                        tracing::debug!(task = %task, "AI backend answered with a fallback");
                        Ok(envelope)
                    }
                    AiStatus::Ok => Ok(envelope),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl AiBackend for HttpAiBackend {
    async fn run(&self, task: AiTask, text: &str) -> Result<AiResponse> {
        self.post(task, serde_json::json!({ "text": text })).await
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let envelope = self
            .post(
                AiTask::Translate,
                serde_json::json!({ "text": text, "target_language": target_language }),
            )
            .await?;

        match &envelope.data {
            serde_json::Value::String(s) => Ok(s.clone()),
            data => data
                .get("translation")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string())
                .ok_or_else(|| Error::Ai("translate: response has no translation".into())),
        }
    }
}
