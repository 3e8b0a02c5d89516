use crate::store::*;

#[tokio::test]
async fn test_fs_blob_roundtrip_and_sharding() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path()).await.unwrap();

    let hash = blobs.save(b"hello world").await.unwrap();
    assert_eq!(hash.len(), 64);
    assert!(dir.path().join(&hash[..2]).join(&hash).exists());
    assert_eq!(blobs.get(&hash).await.unwrap().unwrap(), b"hello world");
}

#[tokio::test]
async fn test_fs_blob_save_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path()).await.unwrap();

    let a = blobs.save(b"same").await.unwrap();
    let b = blobs.save(b"same").await.unwrap();
    assert_eq!(a, b);

    let shard: Vec<_> = std::fs::read_dir(dir.path().join(&a[..2]))
        .unwrap()
        .collect();
    assert_eq!(shard.len(), 1);
}

#[tokio::test]
async fn test_fs_blob_missing_and_malformed_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path()).await.unwrap();

    assert!(blobs.get(&content_hash(b"never saved")).await.unwrap().is_none());
    assert!(blobs.get("../../etc/passwd").await.unwrap().is_none());
    assert!(blobs.get("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_fs_blob_detects_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path()).await.unwrap();

    let hash = blobs.save(b"original").await.unwrap();
    std::fs::write(dir.path().join(&hash[..2]).join(&hash), b"tampered").unwrap();
    assert!(blobs.get(&hash).await.is_err());
}

#[tokio::test]
async fn test_memory_blob_roundtrip() {
    let blobs = MemoryBlobStore::new();
    let hash = blobs.save(b"x").await.unwrap();
    assert_eq!(hash, content_hash(b"x"));
    assert_eq!(blobs.get(&hash).await.unwrap().unwrap(), b"x");
}
