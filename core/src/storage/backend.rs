use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::storage::{Error, Result};

/// Raw byte storage for sidecar records.
///
/// Implementations must report a missing record as [`Error::FileNotFound`], which the
/// sidecar store turns into "no record yet".
#[async_trait]
pub trait MetadataBackend: fmt::Debug + Send + Sync {
    /// Reads the whole record at `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes `content` to `path`, creating missing parent directories.
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Moves the record at `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

fn map_not_found(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}

/// Stores sidecar records on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

#[async_trait]
impl MetadataBackend for LocalBackend {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|e| map_not_found(path, e))
    }

    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        fs::write(path, content).await.map_err(Error::Io)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        fs::rename(from, to).await.map_err(|e| map_not_found(from, e))
    }
}
