//! Fetch pipeline
//!
//! Per source: HTTP fetch, type-specific parse, per-item normalize, optional
//! title translation, then validation. Every failure is contained in the
//! source's [`FetchResult`]; one broken source never affects another.

use crate::ai::AiBackend;
use crate::config::PipelineConfig;
use crate::error::{Error, Result, SourceError};
use crate::events::EventBroadcaster;
use crate::sources::Source;
use crate::types::{Article, Event, RunStatus};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

mod adapters;
pub mod normalize;
mod translate;

pub use adapters::{GdeltAdapter, HtmlAdapter, JsonAdapter, RssAdapter, SourceAdapter};
pub use translate::{TranslatedTitles, translate_titles};

/// Per-call pipeline options
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    /// Translate titles into this language (overrides the configured one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    /// Skip title translation
    #[serde(default)]
    pub skip_translation: bool,
    /// Drop items published before this time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    /// Cap on items taken from each source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

/// One failed source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FetchError {
    /// Source name
    pub source: String,
    /// Endpoint that failed
    pub endpoint: String,
    /// What went wrong
    pub error: String,
}

/// Output of a pipeline run over one or more sources
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FetchResult {
    /// Valid articles, in source order
    pub articles: Vec<Article>,
    /// Sources that produced nothing
    pub errors: Vec<FetchError>,
    /// Dropped items and translation fallbacks
    pub warnings: Vec<String>,
    /// `ok`, `partial`, or `error` when every source failed
    pub status: RunStatus,
}

impl Default for FetchResult {
    fn default() -> Self {
        Self {
            articles: vec![],
            errors: vec![],
            warnings: vec![],
            status: RunStatus::Ok,
        }
    }
}

impl FetchResult {
    fn failed(source: &Source, error: &SourceError) -> Self {
        Self {
            errors: vec![FetchError {
                source: source.name.clone(),
                endpoint: source.endpoint.clone(),
                error: error.to_string(),
            }],
            status: RunStatus::Error,
            ..Self::default()
        }
    }

    /// Concatenate per-source results
    pub fn combine(results: Vec<FetchResult>) -> Self {
        let attempted = results.len();
        let failed = results
            .iter()
            .filter(|r| r.status == RunStatus::Error)
            .count();

        let mut combined = Self::default();
        for result in results {
            combined.articles.extend(result.articles);
            combined.errors.extend(result.errors);
            combined.warnings.extend(result.warnings);
        }
        combined.status = if attempted > 0 && failed == attempted {
            RunStatus::Error
        } else if combined.errors.is_empty() && combined.warnings.is_empty() {
            RunStatus::Ok
        } else {
            RunStatus::Partial
        };
        combined
    }
}

/// Runs sources through fetch, parse, normalize, translate and validate
pub struct FetchPipeline {
    client: reqwest::Client,
    ai: Option<Arc<dyn AiBackend>>,
    events: EventBroadcaster,
    target_language: Option<String>,
    skip_translation: bool,
    max_items_per_source: Option<usize>,
}

impl FetchPipeline {
    /// Create a pipeline
    ///
    /// `ai` is used for title translation only; without it titles are kept
    /// as fetched.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(
        config: &PipelineConfig,
        ai: Option<Arc<dyn AiBackend>>,
        events: EventBroadcaster,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            ai,
            events,
            target_language: config.target_language.clone(),
            skip_translation: config.skip_translation,
            max_items_per_source: config.max_items_per_source,
        })
    }

    fn fail(&self, source: &Source, error: SourceError) -> FetchResult {
        tracing::warn!(source = %source.name, endpoint = %source.endpoint, error = %error, "source fetch failed");
        self.events.broadcast(Event::FetchError {
            source: source.name.clone(),
            endpoint: source.endpoint.clone(),
            message: error.to_string(),
        });
        FetchResult::failed(source, &error)
    }

    async fn download(&self, source: &Source) -> std::result::Result<String, SourceError> {
        let mut request = self.client.get(&source.endpoint);
        if let Some(key) = &source.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await.map_err(|e| SourceError::Request {
            endpoint: source.endpoint.clone(),
            reason: e.to_string(),
        })?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                endpoint: source.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| SourceError::Request {
            endpoint: source.endpoint.clone(),
            reason: format!("failed to read body: {}", e),
        })
    }

    /// Run the pipeline for one source
    ///
    /// Never fails: transport, status and parse failures land in
    /// `errors`; dropped items and translation fallbacks in `warnings`.
    pub async fn fetch_source(&self, source: &Source, options: &FetchOptions) -> FetchResult {
        if !source.enabled {
            tracing::debug!(source = %source.name, "source disabled, skipping");
            return FetchResult::default();
        }

        tracing::debug!(source = %source.name, endpoint = %source.endpoint, "fetching source");
        self.events.broadcast(Event::FetchStart {
            source: source.name.clone(),
            endpoint: source.endpoint.clone(),
        });

        let Some(adapter) = source.source_type.adapter() else {
            return self.fail(
                source,
                SourceError::Parse {
                    endpoint: source.endpoint.clone(),
                    reason: format!("no parser for source type '{}'", source.source_type),
                },
            );
        };

        let payload = match self.download(source).await {
            Ok(payload) => payload,
            Err(e) => return self.fail(source, e),
        };

        let items = match adapter.parse(&payload, source) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(_) => {
                return self.fail(
                    source,
                    SourceError::NotAnArray {
                        endpoint: source.endpoint.clone(),
                    },
                );
            }
            Err(reason) => {
                return self.fail(
                    source,
                    SourceError::Parse {
                        endpoint: source.endpoint.clone(),
                        reason,
                    },
                );
            }
        };

        let cap = options
            .max_items
            .or_else(|| source.option_usize("maxItems"))
            .or(self.max_items_per_source)
            .unwrap_or(usize::MAX);
        let total = items.len().min(cap);
        let fetched_at = Utc::now();

        let mut warnings = Vec::new();
        let mut articles = Vec::with_capacity(total);
        for (index, item) in items.iter().take(cap).enumerate() {
            self.events.broadcast(Event::FetchProgress {
                source: source.name.clone(),
                index: index + 1,
                total,
            });

            match adapter.normalize(item, source, fetched_at) {
                Ok(article) => {
                    if options.since.is_some_and(|since| article.published_at < since) {
                        continue;
                    }
                    articles.push(article);
                }
                Err(reason) => {
                    tracing::debug!(source = %source.name, index, reason = %reason, "item dropped");
                    warnings.push(format!("{}: item {} dropped: {}", source.name, index, reason));
                }
            }
        }

        self.translate(&mut articles, options, &mut warnings).await;

        articles.retain(|article| match article.validate() {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(source = %source.name, url = %article.url, reason = %reason, "invalid article dropped");
                warnings.push(format!("{}: invalid article dropped: {}", source.name, reason));
                false
            }
        });

        tracing::info!(
            source = %source.name,
            count = articles.len(),
            dropped = warnings.len(),
            "source fetched"
        );
        self.events.broadcast(Event::FetchDone {
            source: source.name.clone(),
            count: articles.len(),
        });

        let status = if warnings.is_empty() {
            RunStatus::Ok
        } else {
            RunStatus::Partial
        };
        FetchResult {
            articles,
            errors: vec![],
            warnings,
            status,
        }
    }

    async fn translate(
        &self,
        articles: &mut [Article],
        options: &FetchOptions,
        warnings: &mut Vec<String>,
    ) {
        if options.skip_translation || self.skip_translation {
            return;
        }
        let Some(target) = options
            .target_language
            .as_deref()
            .or(self.target_language.as_deref())
            .filter(|t| !t.trim().is_empty())
        else {
            return;
        };
        let Some(ai) = &self.ai else {
            tracing::debug!(target = %target, "no AI backend, titles left untranslated");
            return;
        };

        let pending: Vec<usize> = articles
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.title.is_empty() && !a.language.eq_ignore_ascii_case(target))
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return;
        }

        let titles: Vec<String> = pending.iter().map(|&i| articles[i].title.clone()).collect();
        let translated = translate_titles(ai.as_ref(), &titles, target).await;
        for (&i, title) in pending.iter().zip(translated.titles) {
            articles[i].title = title;
        }
        warnings.extend(translated.warnings);
    }

    /// Run every enabled source concurrently and concatenate the results
    pub async fn fetch_all(&self, sources: &[Source], options: &FetchOptions) -> FetchResult {
        let results = join_all(
            sources
                .iter()
                .filter(|s| s.enabled)
                .map(|source| self.fetch_source(source, options)),
        )
        .await;
        FetchResult::combine(results)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
