//! Store-backed operations shared by background jobs and API routes.

use crate::ai::{AnalysisOutcome, analyze_article};
use crate::error::{Error, Result};
use crate::fetch::{FetchError, FetchOptions};
use crate::resolver::ArticleMetadata;
use crate::sources::Source;
use crate::store::AddOutcome;
use crate::types::{Article, ArticleAnalyzed, JobId, LogLevel, RunStatus, url_host};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::NewsNode;

/// Outcome of [`NewsNode::fetch_and_store`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    /// Valid articles produced by the pipeline
    pub fetched: usize,
    /// Articles that were new to the local store
    pub added: usize,
    /// Failed sources
    pub errors: Vec<FetchError>,
    /// Dropped items and translation fallbacks
    pub warnings: Vec<String>,
    /// Pipeline status
    pub status: RunStatus,
}

impl FetchSummary {
    /// One-line job message
    pub fn message(&self) -> String {
        let mut message = format!("fetched {}, added {}", self.fetched, self.added);
        if !self.errors.is_empty() {
            message.push_str(&format!(", {} source error(s)", self.errors.len()));
        }
        if !self.warnings.is_empty() {
            message.push_str(&format!(", {} warning(s)", self.warnings.len()));
        }
        message
    }
}

/// Per-source statistics from the local store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    /// Stored articles from this source
    pub article_count: usize,
    /// Newest stored publication time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_published_at: Option<DateTime<Utc>>,
}

/// How to find an article; the first field set wins
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ArticleLookup {
    /// Article id
    pub id: Option<Uuid>,
    /// Content id (federated pointer or blob hash)
    pub cid: Option<String>,
    /// Article url
    pub url: Option<String>,
}

impl ArticleLookup {
    fn describe(&self) -> String {
        match (&self.id, &self.cid, &self.url) {
            (Some(id), _, _) => format!("article id {}", id),
            (None, Some(cid), _) => format!("article cid {}", cid),
            (None, None, Some(url)) => format!("article {}", url),
            (None, None, None) => "article".to_string(),
        }
    }
}

/// A record available now, or a job that will produce it
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved<T> {
    /// Record found
    Ready(T),
    /// Background job queued
    Queued(JobId),
}

impl NewsNode {
    /// Run the pipeline over `sources` and add new articles to the local store
    ///
    /// Source failures are part of the summary, never an `Err`. Fails only if
    /// the local store is not ready or a store write fails.
    pub async fn fetch_and_store(
        &self,
        sources: &[Source],
        options: &FetchOptions,
    ) -> Result<FetchSummary> {
        let local = self.stores.local()?;

        let result = self.pipeline.fetch_all(sources, options).await;
        for error in &result.errors {
            self.debug_log.append(
                format!("fetch failed for {}: {}", error.source, error.error),
                LogLevel::Warn,
                Some(serde_json::json!({"source": error.source, "endpoint": error.endpoint})),
            );
        }

        let fetched = result.articles.len();
        let added = local.add_unique(result.articles).await?;

        let summary = FetchSummary {
            fetched,
            added,
            errors: result.errors,
            warnings: result.warnings,
            status: result.status,
        };
        tracing::info!(
            sources = sources.len(),
            fetched,
            added,
            errors = summary.errors.len(),
            "fetch stored"
        );
        Ok(summary)
    }

    /// Analyze `article` and store the result in the analyzed store
    ///
    /// # Errors
    /// [`Error::NotReady`] without an AI backend or analyzed store,
    /// [`Error::Ai`] when every analysis task failed
    pub async fn analyze_and_store(&self, article: &Article) -> Result<AnalysisOutcome> {
        let analyzed_store = self.stores.analyzed()?;
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| Error::NotReady("ai".to_string()))?;

        let outcome = analyze_article(ai.as_ref(), article, &self.events).await;
        match &outcome.analyzed {
            Some(analyzed) => {
                analyzed_store.add(analyzed.clone(), false).await?;
            }
            None => {
                return Err(Error::Ai(format!(
                    "analysis of {} failed: {}",
                    article.url,
                    outcome.errors.join("; ")
                )));
            }
        }

        if outcome.status == RunStatus::Partial {
            self.debug_log.append(
                format!("partial analysis for {}", article.url),
                LogLevel::Warn,
                Some(serde_json::json!({"articleId": article.id, "errors": outcome.errors})),
            );
        }
        Ok(outcome)
    }

    /// Analyzed record by its own id or by the id of its source article
    pub async fn find_analyzed(&self, id: Uuid) -> Result<Option<ArticleAnalyzed>> {
        let store = self.stores.analyzed()?;
        if let Some(found) = store.get(&id.to_string()).await? {
            return Ok(Some(found));
        }
        store.find(|a| a.original_id == id).await
    }

    /// Local article by id, url or content hash
    pub async fn find_local(&self, lookup: &ArticleLookup) -> Result<Option<Article>> {
        let local = self.stores.local()?;
        if let Some(id) = lookup.id {
            return local.find(|a| a.id == id).await;
        }
        if let Some(cid) = &lookup.cid {
            return local
                .find(|a| a.ipfs_hash.as_deref() == Some(cid.as_str()))
                .await;
        }
        if let Some(url) = &lookup.url {
            return local.get(url).await;
        }
        Err(Error::Validation("one of id, cid or url is required".into()))
    }

    /// Local article with full content, resolving it in the background if
    /// the content is missing
    ///
    /// A stored article with content is returned as is. Otherwise a resolve
    /// job is queued from whatever is known: the stored record, a federated
    /// pointer for `cid`, or the bare `url`.
    pub async fn local_full(&self, lookup: &ArticleLookup) -> Result<Resolved<Article>> {
        let stored = self.find_local(lookup).await?;

        let meta = match stored {
            Some(article) if !article.content.trim().is_empty() => {
                return Ok(Resolved::Ready(article));
            }
            Some(article) => ArticleMetadata {
                url: article.url,
                title: Some(article.title),
                published_at: Some(article.published_at.to_rfc3339()),
                source: Some(article.source),
                content: None,
                ipfs_hash: article.ipfs_hash,
            },
            None => match (&lookup.id, &lookup.cid, &lookup.url) {
                (None, Some(cid), _) => {
                    let pointer = self
                        .stores
                        .federated()?
                        .get(cid)
                        .await?
                        .ok_or_else(|| Error::NotFound(lookup.describe()))?;
                    ArticleMetadata {
                        url: pointer.url,
                        title: Some(pointer.title),
                        published_at: pointer.published_at.map(|p| p.to_rfc3339()),
                        source: Some(pointer.source),
                        content: None,
                        ipfs_hash: Some(pointer.cid),
                    }
                }
                (None, None, Some(url)) => ArticleMetadata::from_url(url.clone()),
                _ => return Err(Error::NotFound(lookup.describe())),
            },
        };

        Ok(Resolved::Queued(self.dispatch_resolve(meta)?))
    }

    /// Analyzed record for an article, queueing analysis if there is none
    ///
    /// `id` may be an analyzed id or a local article id.
    pub async fn analyzed_full(&self, id: Uuid) -> Result<Resolved<ArticleAnalyzed>> {
        if let Some(found) = self.find_analyzed(id).await? {
            return Ok(Resolved::Ready(found));
        }
        if self.ai.is_none() {
            return Err(Error::NotReady("ai".to_string()));
        }

        let article = self
            .find_local(&ArticleLookup {
                id: Some(id),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| Error::NotFound(format!("article id {}", id)))?;
        Ok(Resolved::Queued(self.dispatch_analysis(article)?))
    }

    /// Save one article into the local store
    ///
    /// An article without a source is attributed to its url host.
    pub async fn save_local(&self, mut article: Article, overwrite: bool) -> Result<AddOutcome> {
        if article.source.trim().is_empty()
            && let Some(host) = url_host(&article.url)
        {
            article.source = host;
        }
        if let Err(reason) = article.validate() {
            return Err(Error::Validation(reason));
        }
        self.stores.local()?.add(article, overwrite).await
    }

    /// Article count and newest publication time per source
    pub async fn source_meta(&self) -> Result<HashMap<String, SourceMeta>> {
        let mut meta: HashMap<String, SourceMeta> = HashMap::new();
        for article in self.stores.local()?.all().await? {
            let entry = meta.entry(article.source).or_default();
            entry.article_count += 1;
            if entry
                .latest_published_at
                .is_none_or(|latest| article.published_at > latest)
            {
                entry.latest_published_at = Some(article.published_at);
            }
        }
        Ok(meta)
    }
}
