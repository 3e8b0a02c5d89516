//! Database layer for newsnode
//!
//! SQLite persistence backing the document stores. Every store shares one
//! `documents` table partitioned by store name, so opening a new store needs
//! no schema change.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by concern:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`documents`] - Keyed JSON document CRUD

use sqlx::{FromRow, sqlite::SqlitePool};

mod documents;
mod migrations;

/// Document row from database
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    /// Store (partition) name
    pub store: String,
    /// Document key within the store
    pub key: String,
    /// JSON-encoded document
    pub doc: String,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Database handle for newsnode
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
