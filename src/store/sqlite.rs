use super::DocumentStore;
use crate::db::Database;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Document store backed by the shared SQLite `documents` table
pub struct SqliteDocumentStore {
    db: Arc<Database>,
    name: String,
}

impl SqliteDocumentStore {
    /// Open the `name` partition of `db`
    pub fn new(db: Arc<Database>, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    fn decode(&self, key: &str, doc: &str) -> Result<serde_json::Value> {
        serde_json::from_str(doc).map_err(|e| {
            StoreError::Corrupt {
                store: self.name.clone(),
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.db.get_document(&self.name, key).await? {
            Some(row) => self.decode(key, &row.doc).map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, doc: &serde_json::Value) -> Result<bool> {
        let encoded = serde_json::to_string(doc)?;
        self.db.upsert_document(&self.name, key, &encoded).await
    }

    async fn put_if_absent(&self, key: &str, doc: &serde_json::Value) -> Result<bool> {
        let encoded = serde_json::to_string(doc)?;
        self.db
            .insert_document_if_absent(&self.name, key, &encoded)
            .await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.db.delete_document(&self.name, key).await
    }

    async fn all(&self) -> Result<Vec<serde_json::Value>> {
        let rows = self.db.list_documents(&self.name).await?;
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            match self.decode(&row.key, &row.doc) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(store = %self.name, key = %row.key, error = %e, "skipping corrupt row"),
            }
        }
        Ok(docs)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.db.count_documents(&self.name).await? as usize)
    }
}
