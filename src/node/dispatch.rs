//! Fire-and-forget background jobs.
//!
//! Every dispatch creates a queued job, spawns the work and returns the job
//! id immediately. Progress is only observable through the job tracker and
//! the event broadcaster.

use crate::error::{Error, Result, SourceError};
use crate::fetch::FetchOptions;
use crate::resolver::ArticleMetadata;
use crate::sources::Source;
use crate::types::{Article, JobId, JobStatus, LogLevel};
use std::future::Future;
use std::sync::atomic::Ordering;

use super::NewsNode;

impl NewsNode {
    /// Create a job and run `work` on a detached task
    ///
    /// The job moves queued -> running -> done with the message `work`
    /// returns, or -> error with the failure.
    ///
    /// # Errors
    /// [`Error::ShuttingDown`] once [`NewsNode::shutdown`] has started
    pub(crate) fn spawn_job<F, Fut>(&self, label: impl Into<String>, work: F) -> Result<JobId>
    where
        F: FnOnce(NewsNode) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        if !self.accepting_jobs.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let label = label.into();
        let id = self.jobs.create(label.clone());
        let node = self.clone();

        tokio::spawn(async move {
            if let Err(e) = node.jobs.set_status(id, JobStatus::Running, label.clone(), None) {
                tracing::warn!(job_id = %id, error = %e, "job could not start");
                return;
            }

            let (status, message) = match work(node.clone()).await {
                Ok(message) => {
                    tracing::info!(job_id = %id, source = %label, "{}", message);
                    (JobStatus::Done, message)
                }
                Err(e) => {
                    tracing::warn!(job_id = %id, source = %label, error = %e, "job failed");
                    node.debug_log.append(
                        format!("job {} ({}) failed: {}", id, label, e),
                        LogLevel::Error,
                        Some(serde_json::json!({"jobId": id, "source": label})),
                    );
                    (JobStatus::Error, e.to_string())
                }
            };

            if let Err(e) = node.jobs.set_status(id, status, label, Some(message)) {
                tracing::warn!(job_id = %id, error = %e, "job status rejected");
            }
        });

        Ok(id)
    }

    /// Fetch every enabled source in the background
    pub fn dispatch_fetch_all(&self, options: FetchOptions) -> Result<JobId> {
        self.spawn_job("all", move |node| async move {
            let sources = node.sources.enabled().await;
            let summary = node.fetch_and_store(&sources, &options).await?;
            Ok(summary.message())
        })
    }

    /// Fetch one named source in the background
    ///
    /// # Errors
    /// Unknown or disabled sources are rejected before a job is created
    pub async fn dispatch_fetch_source(&self, name: &str, options: FetchOptions) -> Result<JobId> {
        let source = self
            .sources
            .get(name)
            .await
            .ok_or_else(|| SourceError::UnknownSource {
                name: name.to_string(),
            })?;
        if !source.enabled {
            return Err(SourceError::Disabled {
                name: name.to_string(),
            }
            .into());
        }

        self.spawn_job(source.name.clone(), move |node| async move {
            let summary = node
                .fetch_and_store(std::slice::from_ref(&source), &options)
                .await?;
            match summary.errors.first() {
                Some(failure) if summary.fetched == 0 => Err(Error::Other(failure.error.clone())),
                _ => Ok(summary.message()),
            }
        })
    }

    /// Fetch a caller-supplied source list in the background
    pub fn dispatch_fetch_sources(&self, sources: Vec<Source>, options: FetchOptions) -> Result<JobId> {
        if sources.is_empty() {
            return Err(Error::Validation("at least one source is required".into()));
        }
        self.spawn_job("custom", move |node| async move {
            let summary = node.fetch_and_store(&sources, &options).await?;
            Ok(summary.message())
        })
    }

    /// Analyze one article in the background
    pub fn dispatch_analysis(&self, article: Article) -> Result<JobId> {
        if self.ai.is_none() {
            return Err(Error::NotReady("ai".to_string()));
        }
        self.spawn_job("analysis", move |node| async move {
            let outcome = node.analyze_and_store(&article).await?;
            Ok(format!("analysis of {} finished ({})", article.url, outcome.status))
        })
    }

    /// Resolve full content for one article and store it
    ///
    /// Resolved content is merged into any stored record for the url. When an
    /// AI backend is configured the article is analyzed afterwards; an
    /// analysis failure does not fail the job.
    pub fn dispatch_resolve(&self, meta: ArticleMetadata) -> Result<JobId> {
        self.stores.local()?;
        self.spawn_job("resolve", move |node| async move {
            let resolved = node.resolver.resolve_one(&meta).await?;
            let local = node.stores.local()?;
            let article = match local.get(&resolved.url).await? {
                Some(mut stored) => {
                    stored.absorb_resolved(resolved);
                    stored
                }
                None => resolved,
            };
            local.add(article.clone(), true).await?;
            // Analyze the persisted record so the analysis links back to its id
            let article = local.get(&article.url).await?.unwrap_or(article);

            if node.ai.is_none() {
                return Ok(format!("resolved {}", article.url));
            }
            match node.analyze_and_store(&article).await {
                Ok(outcome) => Ok(format!(
                    "resolved {}, analysis {}",
                    article.url, outcome.status
                )),
                Err(e) => {
                    tracing::warn!(url = %article.url, error = %e, "analysis after resolve failed");
                    Ok(format!("resolved {}, analysis failed", article.url))
                }
            }
        })
    }

    /// Aggregate provider endpoints into the local store in the background
    ///
    /// An empty `endpoints` list falls back to the configured providers.
    pub fn dispatch_aggregation(&self, endpoints: Vec<String>) -> Result<JobId> {
        let endpoints = if endpoints.is_empty() {
            self.config.aggregation.providers.clone()
        } else {
            endpoints
        };
        if endpoints.is_empty() {
            return Err(Error::Validation(
                "no provider endpoints given or configured".into(),
            ));
        }
        self.stores.local()?;

        self.spawn_job("aggregate", move |node| async move {
            let result = node.resolver.aggregate(&endpoints).await;
            for error in &result.errors {
                node.debug_log.append(
                    format!("provider {} failed: {}", error.endpoint, error.error),
                    LogLevel::Warn,
                    None,
                );
            }
            if result.articles.is_empty() && result.errors.len() == endpoints.len() {
                return Err(Error::Other("every provider endpoint failed".into()));
            }

            let resolved = result.articles.len();
            let added = node.stores.local()?.add_unique(result.articles).await?;
            Ok(format!(
                "resolved {}, added {}, dropped {}",
                resolved, added, result.dropped
            ))
        })
    }
}
