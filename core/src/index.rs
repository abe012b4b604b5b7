//! The search index the engine keeps in sync after every tag change.
//!
//! Indexing and querying belong to the host. The engine only reads the indexed entries (for tag
//! collection) and reports changes through [`SearchIndex::reflect_update_sidecar_tags`] and
//! [`SearchIndex::reflect_rename`]. [`MemoryIndex`] is a simple in-memory implementation that
//! can index a location on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::codec;
use crate::storage::{Error, Result, SidecarStore, META_FOLDER};
use crate::tag::{Tag, TagType};

/// One entry in the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    pub path: PathBuf,
    pub is_file: bool,
    /// Filename tags (typed [`TagType::Plain`]) followed by sidecar tags.
    pub tags: Vec<Tag>,
}

impl IndexedEntry {
    /// Directories carry no filename tags, whatever their name looks like.
    fn filename_tags(path: &Path, is_file: bool, delimiter: char) -> Vec<Tag> {
        if !is_file {
            return Vec::new();
        }
        codec::decode_path(path, delimiter)
            .unwrap_or_default()
            .into_iter()
            .map(Tag::plain)
            .collect()
    }
}

pub trait SearchIndex: fmt::Debug + Send + Sync {
    /// Snapshot of the indexed entries, in index order.
    fn entries(&self) -> Vec<IndexedEntry>;

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Replaces the sidecar tags recorded for `path`.
    ///
    /// Implementations may defer the change when `update_index` is false.
    fn reflect_update_sidecar_tags(&self, path: &Path, tags: &[Tag], update_index: bool);

    /// Re-keys `from` (and anything below it) to `to`.
    fn reflect_rename(&self, from: &Path, to: &Path, delimiter: char);
}

/// In-memory [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<Vec<IndexedEntry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<IndexedEntry>) -> Self {
        MemoryIndex {
            entries: RwLock::new(entries),
        }
    }

    pub fn get(&self, path: &Path) -> Option<IndexedEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().find(|e| e.path == path).cloned()
    }

    /// Replaces the index content with every entry found below `root`.
    ///
    /// Sidecar folders are skipped. An entry whose sidecar record cannot be read is indexed
    /// with its filename tags only. Returns the number of indexed entries.
    #[instrument(skip(self, root, store), fields(root = %root.display()))]
    pub async fn index_location(&self, root: &Path, store: &SidecarStore, delimiter: char) -> Result<usize> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut read_dir = fs::read_dir(&dir).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FileNotFound(dir.clone())
                } else {
                    Error::Io(e)
                }
            })?;

            let mut children = Vec::new();
            while let Some(entry) = read_dir.next_entry().await.map_err(Error::Io)? {
                if entry.file_name() == META_FOLDER {
                    continue;
                }
                let file_type = entry.file_type().await.map_err(Error::Io)?;
                children.push((entry.path(), file_type.is_file()));
            }
            // read_dir order is platform dependent
            children.sort();

            for (path, is_file) in children {
                let mut tags = IndexedEntry::filename_tags(&path, is_file, delimiter);
                match store.load(&path, is_file).await {
                    Ok(Some(meta)) => tags.extend(meta.tags),
                    Ok(None) => {}
                    Err(e) => warn!("Indexing '{}' without sidecar tags: {}", path.display(), e),
                }
                if !is_file {
                    pending.push(path.clone());
                }
                found.push(IndexedEntry { path, is_file, tags });
            }
        }

        let count = found.len();
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = found;
        debug!("Indexed {} entries", count);
        Ok(count)
    }
}

impl SearchIndex for MemoryIndex {
    fn entries(&self) -> Vec<IndexedEntry> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn is_empty(&self) -> bool {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    fn reflect_update_sidecar_tags(&self, path: &Path, tags: &[Tag], update_index: bool) {
        if !update_index {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.iter_mut().find(|e| e.path == path) {
            entry.tags.retain(|t| t.tag_type == TagType::Plain);
            entry.tags.extend(tags.iter().cloned());
        }
    }

    fn reflect_rename(&self, from: &Path, to: &Path, delimiter: char) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for entry in entries.iter_mut() {
            let Ok(rest) = entry.path.strip_prefix(from) else {
                continue;
            };
            let renamed = if rest.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(rest)
            };
            if renamed == to {
                let mut tags = IndexedEntry::filename_tags(&renamed, entry.is_file, delimiter);
                tags.extend(entry.tags.drain(..).filter(|t| t.tag_type != TagType::Plain));
                entry.tags = tags;
            }
            entry.path = renamed;
        }
    }
}
