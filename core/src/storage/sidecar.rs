use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::codec;
use crate::storage::{
    Error, FileSystemEntryMeta, MetadataBackend, Result, FOLDER_META_FILE, META_FILE_EXTENSION,
    META_FOLDER,
};

/// Loads and saves the sidecar record of files and directories.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    backend: Arc<dyn MetadataBackend>,
}

impl SidecarStore {
    pub fn new(backend: Arc<dyn MetadataBackend>) -> Self {
        SidecarStore { backend }
    }

    /// Returns where the sidecar record of `path` lives.
    pub fn location(path: &Path, is_file: bool) -> Result<PathBuf> {
        if is_file {
            let name = codec::file_name(path)?;
            let dir = path
                .parent()
                .ok_or_else(|| Error::NoParentDirectory(path.to_path_buf()))?;
            Ok(dir
                .join(META_FOLDER)
                .join(format!("{}.{}", name, META_FILE_EXTENSION)))
        } else {
            Ok(path.join(META_FOLDER).join(FOLDER_META_FILE))
        }
    }

    /// Loads the record of `path`.
    ///
    /// Returns `Ok(None)` if the entry has no record yet.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn load(&self, path: &Path, is_file: bool) -> Result<Option<FileSystemEntryMeta>> {
        let location = Self::location(path, is_file)?;
        let content = match self.backend.read(&location).await {
            Ok(content) => content,
            Err(Error::FileNotFound(_)) => {
                debug!("No sidecar record at {}", location.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let meta = serde_json::from_slice(&content).map_err(|e| {
            warn!("Failed to parse sidecar record '{}': {}", location.display(), e);
            Error::Metadata(e)
        })?;
        Ok(Some(meta))
    }

    /// Saves `meta` as the record of `path`, stamping it with the current time.
    #[instrument(skip(self, path, meta), fields(path = %path.display(), tags = meta.tags.len()))]
    pub async fn save(&self, path: &Path, is_file: bool, meta: &mut FileSystemEntryMeta) -> Result<()> {
        let location = Self::location(path, is_file)?;
        meta.touch();
        let content = serde_json::to_vec_pretty(meta).map_err(Error::Metadata)?;
        self.backend.write(&location, &content).await?;
        debug!("Sidecar record written to {}", location.display());
        Ok(())
    }

    /// Moves the record of a renamed file along with it.
    ///
    /// Directory records live inside the directory and move with it, so this is a no-op
    /// for directories. Returns `Ok(false)` if there was no record to move.
    #[instrument(skip(self, from, to), fields(from = %from.display(), to = %to.display()))]
    pub async fn relocate(&self, from: &Path, to: &Path, is_file: bool) -> Result<bool> {
        if !is_file {
            return Ok(false);
        }
        let old_location = Self::location(from, true)?;
        let new_location = Self::location(to, true)?;
        match self.backend.rename(&old_location, &new_location).await {
            Ok(()) => Ok(true),
            Err(Error::FileNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
