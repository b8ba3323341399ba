use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::texture_pipeline::cache::store::BlobStore;
use crate::texture_pipeline::common::{Result, TextureBuildError};

/// One file per blob under a root directory.
///
/// Each write goes through its own temporary file and a rename, so readers
/// never see a partially written blob, even with concurrent writers.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| TextureBuildError::Store(format!("{}: {}", root.display(), e)))?;
        debug!(root = %root.display(), "opened file blob store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.ddc"))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TextureBuildError::Store(format!("{}: {}", path.display(), e))),
        }
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let mut staging = NamedTempFile::new_in(&self.root)?;
        staging.write_all(data)?;
        staging.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }
}
