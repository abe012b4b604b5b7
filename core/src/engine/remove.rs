use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::{NotificationKind, TagEngine};
use crate::codec;
use crate::config::TagConfig;
use crate::storage::Result;
use crate::tag::Tag;

/// Computes the path `path` has once `titles` are gone from its file name.
fn strip_titles_from_name(path: &Path, is_file: bool, titles: &[&str], config: &TagConfig) -> Result<PathBuf> {
    if !is_file {
        return Ok(path.to_path_buf());
    }
    let mut remaining = codec::decode_path(path, config.delimiter)?;
    let before = remaining.len();
    remaining.retain(|t| !titles.contains(&t.as_str()));
    if remaining.len() == before {
        return Ok(path.to_path_buf());
    }
    codec::encode_path(path, &remaining, config.delimiter)
}

impl TagEngine {
    /// Removes `tags` from every entry in `paths`, one entry after the other.
    ///
    /// Stops at the first entry that fails. Entries handled before it keep their new state.
    #[instrument(skip(self, paths, tags), fields(paths = paths.len(), tags = tags.len()))]
    pub async fn remove_tags(&self, paths: &[PathBuf], tags: &[Tag]) -> bool {
        let config = self.config();
        for path in paths {
            if !self.remove_from_entry(path, tags, &config).await {
                info!("Stopping removal at '{}'", path.display());
                return false;
            }
        }
        true
    }

    /// Removes the tags titled like `tags` from the entry at `path`, from its file name and
    /// from its sidecar.
    ///
    /// Removing a tag the entry does not carry succeeds without changing anything.
    pub async fn remove_tags_from_entry(&self, path: &Path, tags: &[Tag]) -> bool {
        let config = self.config();
        self.remove_from_entry(path, tags, &config).await
    }

    #[instrument(skip(self, path, tags, config), fields(path = %path.display()))]
    async fn remove_from_entry(&self, path: &Path, tags: &[Tag], config: &TagConfig) -> bool {
        let titles: Vec<&str> = tags.iter().map(|t| t.title.as_str()).collect();
        let is_file = match self.platform.properties(path).await {
            Ok(props) => props.is_file,
            Err(e) => {
                warn!("Cannot remove tags: {}", e);
                self.notify(NotificationKind::RemovingSidecarTagsFailed, Some(path));
                return false;
            }
        };
        let new_path = match strip_titles_from_name(path, is_file, &titles, config) {
            Ok(new_path) => new_path,
            Err(e) => {
                warn!("Cannot remove tags: {}", e);
                self.notify(NotificationKind::RemovingSidecarTagsFailed, Some(path));
                return false;
            }
        };

        let meta = match self.store.load(path, is_file).await {
            Ok(Some(meta)) => meta,
            Ok(None) | Err(_) => {
                debug!("No usable sidecar, removing from the file name only");
                return self.rename_entry(path, &new_path, is_file, config).await;
            }
        };

        let mut updated = meta.clone();
        updated.tags.retain(|t| !titles.contains(&t.title.as_str()));
        let sidecar_changed = updated.tags != meta.tags;

        if new_path != path && !self.rename_entry(path, &new_path, is_file, config).await {
            return false;
        }
        if !sidecar_changed {
            return true;
        }

        // The sidecar record has moved along with the entry
        match self.store.save(&new_path, is_file, &mut updated).await {
            Ok(()) => {
                self.propagate(&new_path, &updated.tags, true, false);
                true
            }
            Err(e) => {
                warn!("Removing sidecar tags failed: {}", e);
                self.notify(NotificationKind::RemovingSidecarTagsFailed, Some(&new_path));
                false
            }
        }
    }

    /// Clears the file name tags and then the sidecar tags of every entry in `paths`, one entry
    /// after the other.
    ///
    /// The sidecar of an entry is only cleared once its file name was cleaned up. A failing
    /// file name step stops the batch; a failing sidecar step is logged and does not.
    #[instrument(skip(self, paths), fields(paths = paths.len()))]
    pub async fn remove_all_tags(&self, paths: &[PathBuf]) -> bool {
        let config = self.config();
        for path in paths {
            let Some(renamed) = self.clear_filename_tags(path, &config).await else {
                info!("Stopping at '{}'", path.display());
                return false;
            };
            if !self.clear_sidecar_tags(&renamed).await {
                debug!("No sidecar tags cleared for '{}'", renamed.display());
            }
        }
        true
    }

    /// Removes every tag from the file name of `path`. Directories are left alone.
    pub async fn remove_all_tags_from_filename(&self, path: &Path) -> bool {
        let config = self.config();
        self.clear_filename_tags(path, &config).await.is_some()
    }

    /// Returns the entry's path after clearing, or `None` if it could not be renamed.
    async fn clear_filename_tags(&self, path: &Path, config: &TagConfig) -> Option<PathBuf> {
        let is_file = match self.platform.properties(path).await {
            Ok(props) => props.is_file,
            Err(e) => {
                warn!("Cannot clear tags of '{}': {}", path.display(), e);
                self.notify(NotificationKind::RenamingFailed, Some(path));
                return None;
            }
        };
        if !is_file {
            return Some(path.to_path_buf());
        }

        let new_path = match codec::encode_path(path, &[] as &[&str], config.delimiter) {
            Ok(new_path) => new_path,
            Err(e) => {
                warn!("Cannot clear tags of '{}': {}", path.display(), e);
                self.notify(NotificationKind::RenamingFailed, Some(path));
                return None;
            }
        };
        self.rename_entry(path, &new_path, is_file, config)
            .await
            .then_some(new_path)
    }

    /// Empties the sidecar tag list of `path`.
    ///
    /// Returns false if the entry has no sidecar record.
    pub async fn remove_all_tags_from_metadata(&self, path: &Path) -> bool {
        self.clear_sidecar_tags(path).await
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn clear_sidecar_tags(&self, path: &Path) -> bool {
        let is_file = match self.platform.properties(path).await {
            Ok(props) => props.is_file,
            Err(e) => {
                warn!("Cannot clear sidecar tags: {}", e);
                return false;
            }
        };
        let mut meta = match self.store.load(path, is_file).await {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                debug!("No sidecar record to clear");
                return false;
            }
            Err(e) => {
                warn!("Could not read sidecar record: {}", e);
                return false;
            }
        };

        meta.tags.clear();
        match self.store.save(path, is_file, &mut meta).await {
            Ok(()) => {
                self.propagate(path, &[], true, false);
                true
            }
            Err(e) => {
                warn!("Removing tags in sidecar file failed: {}", e);
                self.notify(NotificationKind::RemovingTagsInSidecarFileFailed, Some(path));
                false
            }
        }
    }
}
