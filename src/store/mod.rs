//! Content stores and the dedup/store writer
//!
//! Three article stores share one [`DocumentStore`] abstraction and differ
//! only in their dedup key:
//! - `local` - [`Article`] keyed by url
//! - `analyzed` - [`ArticleAnalyzed`] keyed by id
//! - `federated` - [`ArticleFederated`] keyed by cid
//!
//! Article content can be pushed to a content-addressable [`BlobStore`] on
//! write; the resulting hash is stamped onto the record.

use crate::config::{PersistenceConfig, StoreBackend};
use crate::db::Database;
use crate::error::{Error, Result, StoreError};
use crate::types::{Article, ArticleAnalyzed, ArticleFederated};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::sync::Arc;

mod blob;
mod memory;
mod sqlite;

pub use blob::{FsBlobStore, MemoryBlobStore, content_hash};
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Name of the local article store
pub const LOCAL_STORE: &str = "local";
/// Name of the analyzed article store
pub const ANALYZED_STORE: &str = "analyzed";
/// Name of the federated pointer store
pub const FEDERATED_STORE: &str = "federated";

/// Keyed JSON document store
///
/// Every operation is atomic for a single key. No cross-key transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store name, used in errors and logs
    fn name(&self) -> &str;

    /// Fetch one document
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Insert or replace; returns true if a document was replaced
    async fn put(&self, key: &str, doc: &serde_json::Value) -> Result<bool>;

    /// Insert only if `key` is free; returns true if written
    async fn put_if_absent(&self, key: &str, doc: &serde_json::Value) -> Result<bool>;

    /// Remove a document; returns true if one existed
    async fn del(&self, key: &str) -> Result<bool>;

    /// Every document, newest write first
    async fn all(&self) -> Result<Vec<serde_json::Value>>;

    /// Number of documents
    async fn count(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }
}

/// Content-addressable blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist bytes, returning their content hash
    async fn save(&self, bytes: &[u8]) -> Result<String>;

    /// Load bytes by content hash
    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>>;
}

/// A record type that lives in an article store
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Dedup key of this record
    fn dedup_key(&self) -> String;

    /// Inline content that should be content-addressed, if not already
    fn unaddressed_content(&self) -> Option<&str> {
        None
    }

    /// Stamp the blob hash returned for [`Self::unaddressed_content`]
    fn set_content_hash(&mut self, _hash: String) {}

    /// Carry identity over from the record being replaced
    fn inherit_from(&mut self, _existing: &Self) {}
}

impl StoredRecord for Article {
    fn dedup_key(&self) -> String {
        self.url.clone()
    }

    fn unaddressed_content(&self) -> Option<&str> {
        if self.ipfs_hash.is_none() && !self.content.trim().is_empty() {
            Some(&self.content)
        } else {
            None
        }
    }

    fn set_content_hash(&mut self, hash: String) {
        self.ipfs_hash = Some(hash);
    }

    fn inherit_from(&mut self, existing: &Self) {
        self.id = existing.id;
    }
}

impl StoredRecord for ArticleAnalyzed {
    fn dedup_key(&self) -> String {
        self.article.id.to_string()
    }

    fn unaddressed_content(&self) -> Option<&str> {
        self.article.unaddressed_content()
    }

    fn set_content_hash(&mut self, hash: String) {
        self.article.ipfs_hash = Some(hash);
    }
}

impl StoredRecord for ArticleFederated {
    fn dedup_key(&self) -> String {
        self.cid.clone()
    }
}

/// Result of [`ArticleStore::add`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Record written
    Added {
        /// Whether an existing record was overwritten
        replaced: bool,
    },
    /// A record already existed and overwrite was not requested
    Skipped,
}

impl AddOutcome {
    /// Whether the record was written
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added { .. })
    }
}

/// Typed dedup/store writer over a [`DocumentStore`]
pub struct ArticleStore<T> {
    docs: Arc<dyn DocumentStore>,
    blobs: Option<Arc<dyn BlobStore>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: StoredRecord> ArticleStore<T> {
    /// Wrap a document store, optionally content-addressing through `blobs`
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Option<Arc<dyn BlobStore>>) -> Self {
        Self {
            docs,
            blobs,
            _record: PhantomData,
        }
    }

    /// Store name
    pub fn name(&self) -> &str {
        self.docs.name()
    }

    /// Write `record` unless its key is taken and `overwrite` is false
    pub async fn add(&self, mut record: T, overwrite: bool) -> Result<AddOutcome> {
        let key = record.dedup_key();
        if key.trim().is_empty() {
            return Err(Error::Validation(format!(
                "{} record has an empty key",
                self.name()
            )));
        }

        let existing = self.get(&key).await?;
        if existing.is_some() && !overwrite {
            tracing::debug!(store = self.name(), key = %key, "record exists, skipping");
            return Ok(AddOutcome::Skipped);
        }
        if let Some(existing) = &existing {
            record.inherit_from(existing);
        }

        self.address_content(&mut record).await;

        let doc = serde_json::to_value(&record)?;
        if overwrite {
            let replaced = self.docs.put(&key, &doc).await?;
            Ok(AddOutcome::Added { replaced })
        } else if self.docs.put_if_absent(&key, &doc).await? {
            Ok(AddOutcome::Added { replaced: false })
        } else {
            // Lost a race with a concurrent writer
            Ok(AddOutcome::Skipped)
        }
    }

    /// Add each record without overwriting; returns how many were new
    pub async fn add_unique(&self, records: Vec<T>) -> Result<usize> {
        let mut added = 0;
        for record in records {
            if self.add(record, false).await?.is_added() {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Look up one record by key
    pub async fn get(&self, key: &str) -> Result<Option<T>> {
        match self.docs.get(key).await? {
            None => Ok(None),
            Some(doc) => serde_json::from_value(doc).map(Some).map_err(|e| {
                Error::Store(StoreError::Corrupt {
                    store: self.name().to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }),
        }
    }

    /// Remove by key; absence is not an error
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.docs.del(key).await
    }

    /// Every record, newest write first
    ///
    /// Documents that no longer decode are logged and skipped.
    pub async fn all(&self) -> Result<Vec<T>> {
        let docs = self.docs.all().await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            match serde_json::from_value::<T>(doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(store = self.name(), error = %e, "skipping undecodable document")
                }
            }
        }
        Ok(records)
    }

    /// Full-scan filter
    pub async fn query<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().filter(|r| predicate(r)).collect())
    }

    /// First record matching `predicate`
    pub async fn find<P>(&self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|r| predicate(r)))
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<usize> {
        self.docs.count().await
    }

    // Best effort: the metadata write goes ahead without a hash on failure
    async fn address_content(&self, record: &mut T) {
        let Some(blobs) = &self.blobs else {
            return;
        };
        let Some(content) = record.unaddressed_content() else {
            return;
        };
        match blobs.save(content.as_bytes()).await {
            Ok(hash) => record.set_content_hash(hash),
            Err(e) => {
                tracing::warn!(store = self.name(), error = %e, "blob store unavailable, storing without content hash")
            }
        }
    }
}

/// The node's store handles
///
/// A handle that was never opened yields [`Error::NotReady`] from its
/// accessor; callers check once at the boundary instead of per call.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    local: Option<Arc<ArticleStore<Article>>>,
    analyzed: Option<Arc<ArticleStore<ArticleAnalyzed>>>,
    federated: Option<Arc<ArticleStore<ArticleFederated>>>,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl StoreRegistry {
    /// Registry with no open stores
    pub fn empty() -> Self {
        Self::default()
    }

    /// Open every store from configuration
    pub async fn open(config: &PersistenceConfig) -> Result<Self> {
        let blobs: Arc<dyn BlobStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryBlobStore::new()),
            StoreBackend::Sqlite => Arc::new(FsBlobStore::new(&config.blob_dir).await?),
        };

        let (local, analyzed, federated): (
            Arc<dyn DocumentStore>,
            Arc<dyn DocumentStore>,
            Arc<dyn DocumentStore>,
        ) = match config.backend {
            StoreBackend::Memory => (
                Arc::new(MemoryDocumentStore::new(LOCAL_STORE)),
                Arc::new(MemoryDocumentStore::new(ANALYZED_STORE)),
                Arc::new(MemoryDocumentStore::new(FEDERATED_STORE)),
            ),
            StoreBackend::Sqlite => {
                let db = Arc::new(Database::new(&config.database_path).await?);
                (
                    Arc::new(SqliteDocumentStore::new(db.clone(), LOCAL_STORE)),
                    Arc::new(SqliteDocumentStore::new(db.clone(), ANALYZED_STORE)),
                    Arc::new(SqliteDocumentStore::new(db, FEDERATED_STORE)),
                )
            }
        };

        tracing::info!(backend = ?config.backend, "stores opened");
        Ok(Self::from_parts(
            Some(local),
            Some(analyzed),
            Some(federated),
            Some(blobs),
        ))
    }

    /// In-memory stores with an in-memory blob store
    pub fn in_memory() -> Self {
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        Self::from_parts(
            Some(Arc::new(MemoryDocumentStore::new(LOCAL_STORE))),
            Some(Arc::new(MemoryDocumentStore::new(ANALYZED_STORE))),
            Some(Arc::new(MemoryDocumentStore::new(FEDERATED_STORE))),
            Some(blobs),
        )
    }

    /// Build from individual handles; `None` leaves that store not ready
    pub fn from_parts(
        local: Option<Arc<dyn DocumentStore>>,
        analyzed: Option<Arc<dyn DocumentStore>>,
        federated: Option<Arc<dyn DocumentStore>>,
        blobs: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        Self {
            local: local.map(|d| Arc::new(ArticleStore::new(d, blobs.clone()))),
            analyzed: analyzed.map(|d| Arc::new(ArticleStore::new(d, blobs.clone()))),
            federated: federated.map(|d| Arc::new(ArticleStore::new(d, None))),
            blobs,
        }
    }

    /// Local article store (keyed by url)
    pub fn local(&self) -> Result<&Arc<ArticleStore<Article>>> {
        self.local
            .as_ref()
            .ok_or_else(|| Error::NotReady(LOCAL_STORE.to_string()))
    }

    /// Analyzed article store (keyed by id)
    pub fn analyzed(&self) -> Result<&Arc<ArticleStore<ArticleAnalyzed>>> {
        self.analyzed
            .as_ref()
            .ok_or_else(|| Error::NotReady(ANALYZED_STORE.to_string()))
    }

    /// Federated pointer store (keyed by cid)
    pub fn federated(&self) -> Result<&Arc<ArticleStore<ArticleFederated>>> {
        self.federated
            .as_ref()
            .ok_or_else(|| Error::NotReady(FEDERATED_STORE.to_string()))
    }

    /// Blob store, if configured
    pub fn blobs(&self) -> Option<&Arc<dyn BlobStore>> {
        self.blobs.as_ref()
    }

    /// Readiness of each store by name
    pub fn readiness(&self) -> Vec<(&'static str, bool)> {
        vec![
            (LOCAL_STORE, self.local.is_some()),
            (ANALYZED_STORE, self.analyzed.is_some()),
            (FEDERATED_STORE, self.federated.is_some()),
            ("blobs", self.blobs.is_some()),
        ]
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
