//! Filesystem primitives the engine needs from its host: probing an entry and renaming it.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::storage::{Error, Result};

/// What the engine needs to know about an entry before touching its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryProperties {
    pub is_file: bool,
    pub size: u64,
}

#[async_trait]
pub trait Platform: fmt::Debug + Send + Sync {
    /// Probes the entry at `path`.
    async fn properties(&self, path: &Path) -> Result<EntryProperties>;

    /// Renames the entry at `from` to `to`.
    ///
    /// Must fail with [`Error::AlreadyExists`] instead of replacing an existing entry.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

/// [`Platform`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlatform;

#[async_trait]
impl Platform for LocalPlatform {
    async fn properties(&self, path: &Path) -> Result<EntryProperties> {
        let meta = fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(EntryProperties {
            is_file: meta.is_file(),
            size: meta.len(),
        })
    }

    #[instrument(skip(self, from, to), fields(from = %from.display(), to = %to.display()))]
    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if fs::try_exists(to).await.map_err(Error::Io)? {
            return Err(Error::AlreadyExists(to.to_path_buf()));
        }
        fs::rename(from, to).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(from.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        debug!("Entry renamed");
        Ok(())
    }
}
