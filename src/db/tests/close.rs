use crate::db::*;
use tempfile::NamedTempFile;

/// Reading after the pool is closed returns an error rather than hanging
#[tokio::test]
async fn test_get_document_after_pool_close_returns_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.upsert_document("local", "k", "{}").await.unwrap();
    assert!(db.get_document("local", "k").await.unwrap().is_some());

    db.close().await;

    let result = db.get_document("local", "k").await;
    assert!(
        result.is_err(),
        "get_document after pool close should return an error, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_writes_after_pool_close_return_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.close().await;

    assert!(db.upsert_document("local", "k", "{}").await.is_err());
    assert!(db.insert_document_if_absent("local", "k", "{}").await.is_err());
    assert!(db.delete_document("local", "k").await.is_err());
    assert!(db.list_documents("local").await.is_err());
}
