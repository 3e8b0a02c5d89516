use super::BlobStore;
use crate::error::{Error, Result, StoreError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Lowercase hex SHA-256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Filesystem blob store
///
/// Blobs live at `<root>/<first two hex chars>/<hash>`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a blob directory
    pub async fn new(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[..2]).join(hash)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, bytes: &[u8]) -> Result<String> {
        let hash = content_hash(bytes);
        let path = self.path_for(&hash);
        if tokio::fs::try_exists(&path).await? {
            return Ok(hash);
        }

        if let Some(shard) = path.parent() {
            tokio::fs::create_dir_all(shard).await?;
        }
        // Write-then-rename so readers never see a partial blob
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::Io(e));
        }

        tracing::debug!(hash = %hash, size = bytes.len(), "blob saved");
        Ok(hash)
    }

    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        if !is_valid_hash(hash) {
            return Ok(None);
        }
        match tokio::fs::read(self.path_for(hash)).await {
            Ok(bytes) => {
                if content_hash(&bytes) != hash {
                    return Err(StoreError::Corrupt {
                        store: "blobs".to_string(),
                        key: hash.to_string(),
                        reason: "content does not match its hash".to_string(),
                    }
                    .into());
                }
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, bytes: &[u8]) -> Result<String> {
        let hash = content_hash(bytes);
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(hash.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(hash)
    }

    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(hash)
            .cloned())
    }
}
