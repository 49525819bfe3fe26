//! Filesystem storage for payloads kept outside the record store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::Error;

/// Default blob root, relative to the working directory.
pub const DEFAULT_BLOB_ROOT: &str = ".cached_files";

/// Byte storage under a root directory, addressed by relative paths.
///
/// The root is created lazily by the first write.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a relative blob path under the root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `bytes` at `relative`, creating missing parent directories and
    /// replacing any existing file. Returns the full path written.
    pub async fn store(&self, relative: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf, Error> {
        let path = self.resolve(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::Blob { path: parent.to_path_buf(), source })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| Error::Blob { path: path.clone(), source })?;

        tracing::debug!("stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Read the bytes stored at `relative`.
    pub async fn read(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
        let relative = relative.as_ref();
        let path = self.resolve(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobNotFound(relative.to_path_buf())),
            Err(source) => Err(Error::Blob { path, source }),
        }
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_BLOB_ROOT)
    }
}
