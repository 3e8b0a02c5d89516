//! Aggregation resolver
//!
//! Turns lightweight article metadata from provider endpoints into full
//! articles. Content is resolved in tiers: inline content, then the blob and
//! local stores, then a direct fetch of the article page. Each item runs
//! under its own timeout; an item that fails or times out is dropped without
//! affecting the rest of the batch.

use crate::config::{AggregationConfig, PipelineConfig};
use crate::error::{Error, Result, SourceError};
use crate::fetch::FetchError;
use crate::fetch::normalize::{extract_readable_text, extract_title, normalize_text, parse_published};
use crate::store::StoreRegistry;
use crate::types::{Article, SourceType, url_host};
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

/// Lightweight article reference from a provider
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    /// Article page
    pub url: String,
    /// Headline, if the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Publication time in any supported date format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Provider or outlet name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Inline article text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Content hash in the blob store
    #[serde(default, alias = "cid", skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
}

impl ArticleMetadata {
    /// Metadata with only a url
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Where an article's content came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentTier {
    /// Supplied with the metadata
    Inline,
    /// Blob store, by content hash
    Blob,
    /// Local article store, by url
    Local,
    /// Fetched from the article page
    Remote,
}

/// Output of [`AggregationResolver::aggregate`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AggregationResult {
    /// Resolved articles
    pub articles: Vec<Article>,
    /// Provider endpoints that failed
    pub errors: Vec<FetchError>,
    /// Items listed by providers but dropped during resolution
    pub dropped: usize,
}

/// Resolves full article content from metadata
pub struct AggregationResolver {
    client: reqwest::Client,
    stores: StoreRegistry,
    timeout: Duration,
    max_concurrent: usize,
}

impl AggregationResolver {
    /// Create a resolver reading from `stores`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(
        config: &AggregationConfig,
        pipeline: &PipelineConfig,
        stores: StoreRegistry,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(pipeline.fetch_timeout)
            .user_agent(pipeline.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            stores,
            timeout: config.timeout,
            max_concurrent: config.max_concurrent.max(1),
        })
    }

    /// Draft article with empty content fields
    pub fn draft(meta: &ArticleMetadata) -> Article {
        let source = meta
            .source
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| url_host(&meta.url))
            .unwrap_or_default();

        let mut article = Article::draft(meta.url.trim(), source, SourceType::Manual);
        article.title = meta
            .title
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();
        if let Some(published) = meta.published_at.as_deref().and_then(parse_published) {
            article.published_at = published;
        }
        article.ipfs_hash = meta.ipfs_hash.clone();
        article
    }

    async fn from_stores(&self, article: &mut Article) -> Option<ContentTier> {
        if let (Some(hash), Some(blobs)) = (article.ipfs_hash.as_deref(), self.stores.blobs()) {
            match blobs.get(hash).await {
                Ok(Some(bytes)) => {
                    let content = String::from_utf8_lossy(&bytes).trim().to_string();
                    if !content.is_empty() {
                        article.content = content;
                        return Some(ContentTier::Blob);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(url = %article.url, hash = %hash, error = %e, "blob lookup failed");
                }
            }
        }

        let Ok(local) = self.stores.local() else {
            return None;
        };
        let stored = match local.get(&article.url).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(url = %article.url, error = %e, "local lookup failed");
                return None;
            }
        };
        if stored.content.trim().is_empty() {
            return None;
        }

        article.content = stored.content;
        if article.title.is_empty() {
            article.title = stored.title;
        }
        if article.summary.is_empty() {
            article.summary = stored.summary;
        }
        if article.ipfs_hash.is_none() {
            article.ipfs_hash = stored.ipfs_hash;
        }
        Some(ContentTier::Local)
    }

    async fn from_remote(&self, article: &mut Article) -> Result<ContentTier> {
        let response = self
            .client
            .get(&article.url)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                endpoint: article.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                endpoint: article.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let payload = response.text().await.map_err(|e| SourceError::Request {
            endpoint: article.url.clone(),
            reason: format!("failed to read body: {}", e),
        })?;

        let content = extract_readable_text(&payload);
        if content.is_empty() {
            return Err(Error::Validation(format!(
                "no readable text at {}",
                article.url
            )));
        }
        if article.title.is_empty() {
            article.title = extract_title(&payload).unwrap_or_default();
        }
        article.content = content;
        Ok(ContentTier::Remote)
    }

    async fn resolve_content(
        &self,
        meta: &ArticleMetadata,
    ) -> Result<(Article, ContentTier)> {
        let mut article = Self::draft(meta);

        if let Some(content) = meta.content.as_deref().map(normalize_text)
            && !content.is_empty()
        {
            article.content = content;
            return Ok((article, ContentTier::Inline));
        }

        if let Some(tier) = self.from_stores(&mut article).await {
            return Ok((article, tier));
        }

        let tier = self.from_remote(&mut article).await?;
        Ok((article, tier))
    }

    /// Resolve one item within the configured timeout
    ///
    /// # Errors
    /// Returns [`Error::Timeout`] when resolution takes too long, a validation
    /// error for an unusable url, or the tier's fetch error
    pub async fn resolve_one(&self, meta: &ArticleMetadata) -> Result<Article> {
        match url::Url::parse(meta.url.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::Validation(format!(
                    "'{}' is not an absolute http(s) url",
                    meta.url
                )));
            }
        }

        let (mut article, tier) = tokio::time::timeout(self.timeout, self.resolve_content(meta))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "resolving {} took longer than {}ms",
                    meta.url,
                    self.timeout.as_millis()
                ))
            })??;

        article.fetched_at = Utc::now();
        tracing::debug!(url = %article.url, tier = ?tier, "article resolved");
        Ok(article)
    }

    /// Resolve a batch, dropping items that fail or time out
    ///
    /// Output order follows input order.
    pub async fn resolve(&self, items: Vec<ArticleMetadata>) -> Vec<Article> {
        futures::stream::iter(items)
            .map(|meta| async move {
                match self.resolve_one(&meta).await {
                    Ok(article) => Some(article),
                    Err(e) => {
                        tracing::warn!(url = %meta.url, error = %e, "dropping unresolved article");
                        None
                    }
                }
            })
            .buffered(self.max_concurrent)
            .filter_map(|article| async move { article })
            .collect()
            .await
    }

    /// Read a provider's metadata list
    ///
    /// The payload is an array of items, or an object holding one under
    /// `articles`, `items` or `links`. Items may be bare url strings.
    /// Entries without a url are skipped.
    pub async fn fetch_metadata(&self, endpoint: &str) -> Result<Vec<ArticleMetadata>> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| SourceError::Parse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let list = match payload {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => ["articles", "items", "links"]
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(serde_json::Value::Array(items)) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| SourceError::NotAnArray {
                    endpoint: endpoint.to_string(),
                })?,
            _ => {
                return Err(SourceError::NotAnArray {
                    endpoint: endpoint.to_string(),
                }
                .into());
            }
        };

        Ok(list
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(url) => Some(ArticleMetadata::from_url(url)),
                other => match serde_json::from_value::<ArticleMetadata>(other) {
                    Ok(meta) if !meta.url.trim().is_empty() => Some(meta),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::debug!(endpoint = %endpoint, error = %e, "skipping malformed metadata item");
                        None
                    }
                },
            })
            .collect())
    }

    /// Collect metadata from every endpoint and resolve it
    ///
    /// Endpoint failures are recorded in `errors` and never stop the others.
    pub async fn aggregate(&self, endpoints: &[String]) -> AggregationResult {
        let listings =
            futures::future::join_all(endpoints.iter().map(|e| self.fetch_metadata(e))).await;

        let mut errors = Vec::new();
        let mut links = Vec::new();
        for (endpoint, listing) in endpoints.iter().zip(listings) {
            match listing {
                Ok(items) => {
                    tracing::debug!(endpoint = %endpoint, count = items.len(), "provider listing fetched");
                    links.extend(items);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "provider listing failed");
                    errors.push(FetchError {
                        source: "aggregate".to_string(),
                        endpoint: endpoint.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let listed = links.len();
        let articles = self.resolve(links).await;
        tracing::info!(
            providers = endpoints.len(),
            listed,
            resolved = articles.len(),
            "aggregation finished"
        );

        AggregationResult {
            dropped: listed - articles.len(),
            articles,
            errors,
        }
    }
}
