//! The cache of entries currently opened by the user.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::tag::Tag;

/// Partial state pushed into the open-file cache after a tag change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenedFileUpdate {
    pub tags: Option<Vec<Tag>>,
    /// The entry was moved to this path.
    pub new_path: Option<PathBuf>,
    /// The entry's sidecar record was created by this change.
    pub changed: bool,
}

/// Receives tag updates for entries that are currently open.
pub trait OpenedFiles: fmt::Debug + Send + Sync {
    fn is_open(&self, path: &Path) -> bool;

    fn update_opened_file(&self, path: &Path, update: OpenedFileUpdate);
}

/// An entry held open by [`MemoryOpenedFiles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedFile {
    pub path: PathBuf,
    pub tags: Vec<Tag>,
    pub changed: bool,
}

/// In-memory open-file cache.
#[derive(Debug, Default)]
pub struct MemoryOpenedFiles {
    files: Mutex<Vec<OpenedFile>>,
}

impl MemoryOpenedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: impl Into<PathBuf>, tags: Vec<Tag>) {
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.push(OpenedFile {
            path: path.into(),
            tags,
            changed: false,
        });
    }

    pub fn get(&self, path: &Path) -> Option<OpenedFile> {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.iter().find(|f| f.path == path).cloned()
    }
}

impl OpenedFiles for MemoryOpenedFiles {
    fn is_open(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    fn update_opened_file(&self, path: &Path, update: OpenedFileUpdate) {
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = files.iter_mut().find(|f| f.path == path) {
            if let Some(tags) = update.tags {
                file.tags = tags;
            }
            if let Some(new_path) = update.new_path {
                file.path = new_path;
            }
            file.changed |= update.changed;
        }
    }
}
