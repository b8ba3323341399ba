use std::sync::Arc;

use tracing::trace;

use crate::texture_pipeline::common::{Completion, Result, TextureBuildError};

/// Persistent key/value storage for derived data.
pub trait BlobStore: Send + Sync {
    /// Returns `None` on a miss.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

type FetchOutcome = std::result::Result<Option<Vec<u8>>, String>;

/// A `get` running on the worker pool.
pub struct PendingGet {
    key: String,
    completion: Arc<Completion<FetchOutcome>>,
}

impl PendingGet {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_ready(&self) -> bool {
        self.completion.is_complete()
    }

    /// Non-blocking poll; `None` while the read is still running.
    pub fn try_get(&self) -> Option<Result<Option<Vec<u8>>>> {
        self.completion.try_get().map(|outcome| outcome.map_err(TextureBuildError::Store))
    }

    pub fn wait(self) -> Result<Option<Vec<u8>>> {
        self.completion.wait().map_err(TextureBuildError::Store)
    }
}

/// Starts `store.get(key)` on the worker pool.
pub fn get_async<S: BlobStore + ?Sized + 'static>(store: Arc<S>, key: &str) -> PendingGet {
    let completion = Arc::new(Completion::new());
    let pending = PendingGet {
        key: key.to_string(),
        completion: completion.clone(),
    };

    let key = key.to_string();
    rayon::spawn(move || {
        trace!(%key, "async blob read");
        completion.complete(store.get(&key).map_err(|e| e.to_string()));
    });
    pending
}
