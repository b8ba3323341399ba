use std::collections::HashMap;

use parking_lot::RwLock;

use crate::texture_pipeline::cache::store::BlobStore;
use crate::texture_pipeline::common::Result;

/// Process-local store, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Drops one blob, as an eviction would.
    pub fn remove(&self, key: &str) -> bool {
        self.blobs.write().remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.blobs.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(key))
    }
}
