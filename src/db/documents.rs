//! Keyed JSON document storage, partitioned by store name.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, DocumentRow};

impl Database {
    /// Get one document
    pub async fn get_document(&self, store: &str, key: &str) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT store, key, doc, updated_at
            FROM documents
            WHERE store = ? AND key = ?
            "#,
        )
        .bind(store)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get document: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Insert or replace a document
    ///
    /// Returns true if a document already existed under the key.
    pub async fn upsert_document(&self, store: &str, key: &str, doc: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let existed: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM documents WHERE store = ? AND key = ?")
                .bind(store)
                .bind(key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check document: {}",
                        e
                    )))
                })?;

        sqlx::query(
            r#"
            INSERT INTO documents (store, key, doc, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(store, key) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at
            "#,
        )
        .bind(store)
        .bind(key)
        .bind(doc)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert document: {}",
                e
            )))
        })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit document: {}",
                e
            )))
        })?;

        Ok(existed.is_some())
    }

    /// Insert a document only if the key is free
    ///
    /// Returns true if the document was written. A single statement, so two
    /// concurrent writers of the same key cannot both win.
    pub async fn insert_document_if_absent(&self, store: &str, key: &str, doc: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (store, key, doc, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(store, key) DO NOTHING
            "#,
        )
        .bind(store)
        .bind(key)
        .bind(doc)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert document: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a document
    ///
    /// Returns true if a row was removed. Deleting a missing key is not an error.
    pub async fn delete_document(&self, store: &str, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE store = ? AND key = ?")
            .bind(store)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete document: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// List every document in a store, newest write first
    pub async fn list_documents(&self, store: &str) -> Result<Vec<DocumentRow>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT store, key, doc, updated_at
            FROM documents
            WHERE store = ?
            ORDER BY updated_at DESC, key ASC
            "#,
        )
        .bind(store)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list documents: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Count documents in a store
    pub async fn count_documents(&self, store: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE store = ?")
            .bind(store)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count documents: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}
