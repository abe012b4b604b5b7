//! The tag synchronization engine.
//!
//! [`TagEngine`] owns every write to an entry's tags, in both places they can live: encoded
//! into the entry's file name, or in its sidecar record. Which one is used is decided per entry
//! by [`Representation::select`](crate::config::Representation::select):
//!
//! *   **Directories** always keep their tags in the sidecar.
//! *   **Files** use the sidecar if their location asks for it, or (without a location
//!     override) if the global setting does. Otherwise tags go into the file name.
//!
//! # Operations
//!
//! All public operations take paths and return `bool`. Failures never propagate as errors:
//! they are logged, reported through [`EngineEvents::notification`] and turned into `false`.
//!
//! *   [`add_tags`](TagEngine::add_tags) resolves generator tags and adds the result to every
//!     path concurrently.
//! *   [`edit_tag_for_entry`](TagEngine::edit_tag_for_entry) renames and/or moves one tag.
//! *   [`remove_tags`](TagEngine::remove_tags) and [`remove_all_tags`](TagEngine::remove_all_tags)
//!     work through their paths one after the other and stop at the first failure. Paths
//!     already done are not rolled back.
//!
//! A file is renamed before its sidecar is touched, so a rejected rename leaves both
//! representations as they were. Renames whose target equals the current path are skipped.
//!
//! # Configuration
//!
//! Each operation works on a [`TagConfig`] snapshot taken when it starts. Replacing the
//! configuration with [`TagEngine::set_config`] only affects operations started afterwards.

mod add;
mod edit;
mod events;
mod remove;

pub use self::add::{ResolvedTags, resolve_tags};
pub use self::events::{
    EditTagRequested, EngineEvents, EntryRenamed, Notification, NotificationKind, Severity, TagsChanged,
};

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument, warn};

use crate::config::TagConfig;
use crate::index::SearchIndex;
use crate::library::TagLibrary;
use crate::library::collector::{TagStyle, collect_tags, select_new_tags};
use crate::opened_files::{OpenedFileUpdate, OpenedFiles};
use crate::platform::Platform;
use crate::storage::SidecarStore;
use crate::tag::{Tag, TagGroup};

/// Keeps filename tags, sidecar tags and their in-memory consumers in sync.
#[derive(Debug)]
pub struct TagEngine {
    platform: Arc<dyn Platform>,
    store: SidecarStore,
    opened_files: Arc<dyn OpenedFiles>,
    index: Arc<dyn SearchIndex>,
    library: Arc<dyn TagLibrary>,
    config: RwLock<TagConfig>,
    pub on: EngineEvents,
}

impl TagEngine {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: SidecarStore,
        opened_files: Arc<dyn OpenedFiles>,
        index: Arc<dyn SearchIndex>,
        library: Arc<dyn TagLibrary>,
        config: TagConfig,
    ) -> Self {
        TagEngine {
            platform,
            store,
            opened_files,
            index,
            library,
            config: RwLock::new(config),
            on: EngineEvents::new(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> TagConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_config(&self, config: TagConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    pub fn store(&self) -> &SidecarStore {
        &self.store
    }

    fn notify(&self, kind: NotificationKind, path: Option<&Path>) {
        self.on
            .notification
            .emit(Notification::new(kind, path.map(Path::to_path_buf)));
    }

    /// Pushes freshly persisted sidecar tags to the open-file cache and the search index.
    fn propagate(&self, path: &Path, tags: &[Tag], update_index: bool, created: bool) {
        if self.opened_files.is_open(path) {
            self.opened_files.update_opened_file(
                path,
                OpenedFileUpdate {
                    tags: Some(tags.to_vec()),
                    new_path: None,
                    changed: created,
                },
            );
        }
        self.index.reflect_update_sidecar_tags(path, tags, update_index);
        self.on.tags_changed.emit(TagsChanged {
            path: path.to_path_buf(),
            tags: tags.to_vec(),
        });
    }

    /// Renames `from` to `to` and moves everything keyed by the old path along.
    ///
    /// Returns true without touching the filesystem if both paths are equal. A rejected
    /// rename is reported to the user.
    #[instrument(skip(self, from, to, config), fields(from = %from.display(), to = %to.display()))]
    async fn rename_entry(&self, from: &Path, to: &Path, is_file: bool, config: &TagConfig) -> bool {
        if from == to {
            debug!("Name unchanged, skipping rename");
            return true;
        }
        if let Err(e) = self.platform.rename(from, to).await {
            warn!("Renaming failed: {}", e);
            self.notify(NotificationKind::RenamingFailed, Some(from));
            return false;
        }

        if is_file {
            // The entry is already renamed, a stale sidecar is better than reporting failure
            if let Err(e) = self.store.relocate(from, to, is_file).await {
                warn!("Failed to move sidecar record along with the entry: {}", e);
            }
        }
        self.index.reflect_rename(from, to, config.delimiter);
        if self.opened_files.is_open(from) {
            self.opened_files.update_opened_file(
                from,
                OpenedFileUpdate {
                    new_path: Some(to.to_path_buf()),
                    ..Default::default()
                },
            );
        }
        self.on.entry_renamed.emit(EntryRenamed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        true
    }

    /// Adds the collectable tags of `tags` that the library does not know yet to the
    /// "Collected Tags" group. Failures are logged and otherwise ignored.
    async fn collect_into_library(&self, tags: &[Tag], config: &TagConfig) {
        let library = match self.library.tag_groups().await {
            Ok(library) => library,
            Err(e) => {
                warn!("Skipping tag collection, library unavailable: {}", e);
                return;
            }
        };
        let new_tags = select_new_tags(tags, &library, &style(config));
        if new_tags.is_empty() {
            return;
        }

        debug!("Collecting {} tags into the library", new_tags.len());
        let group = TagGroup::collected(
            Some(config.tag_color.clone()),
            Some(config.tag_text_color.clone()),
            new_tags,
        );
        if let Err(e) = self.library.merge_tag_group(group).await {
            warn!("Failed to collect tags into the library: {}", e);
        }
    }

    /// Collects the tags used throughout the search index into `group` and merges the result
    /// into the library.
    ///
    /// Fails if nothing has been indexed yet.
    pub async fn collect_tags_from_location(&self, group: &TagGroup) -> bool {
        if self.index.is_empty() {
            self.notify(NotificationKind::IndexLocationFirst, None);
            return false;
        }
        let config = self.config();
        let collected = collect_tags(&self.index.entries(), group, &style(&config));
        info!("Collected {} new tags into '{}'", collected.len(), group.title);

        let merged = TagGroup {
            children: collected,
            ..group.clone()
        };
        match self.library.merge_tag_group(merged).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to merge collected tags: {}", e);
                self.notify(NotificationKind::CollectingTagsFailed, None);
                false
            }
        }
    }
}

fn style(config: &TagConfig) -> TagStyle {
    TagStyle {
        color: config.tag_color.clone(),
        text_color: config.tag_text_color.clone(),
    }
}
