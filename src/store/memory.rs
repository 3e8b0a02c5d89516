use super::DocumentStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-memory document store
///
/// Used for the `memory` backend and in tests.
pub struct MemoryDocumentStore {
    name: String,
    // key -> (write sequence, document)
    docs: Mutex<HashMap<String, (u64, serde_json::Value)>>,
    seq: std::sync::atomic::AtomicU64,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: Mutex::new(HashMap::new()),
            seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (u64, serde_json::Value)>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.lock().get(key).map(|(_, doc)| doc.clone()))
    }

    async fn put(&self, key: &str, doc: &serde_json::Value) -> Result<bool> {
        let seq = self.next_seq();
        Ok(self
            .lock()
            .insert(key.to_string(), (seq, doc.clone()))
            .is_some())
    }

    async fn put_if_absent(&self, key: &str, doc: &serde_json::Value) -> Result<bool> {
        let seq = self.next_seq();
        let mut docs = self.lock();
        if docs.contains_key(key) {
            return Ok(false);
        }
        docs.insert(key.to_string(), (seq, doc.clone()));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.lock().remove(key).is_some())
    }

    async fn all(&self) -> Result<Vec<serde_json::Value>> {
        let mut entries: Vec<(u64, serde_json::Value)> = self.lock().values().cloned().collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}
