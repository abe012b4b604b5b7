use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::{EditTagRequested, NotificationKind, TagEngine};
use crate::codec;
use crate::config::{Representation, TagConfig};
use crate::storage::Result;
use crate::tag::{Functionality, Tag, TagType, contains_title, format_datetime_tag};

/// Input tags sorted by what has to happen to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTags {
    /// Tags with a concrete title, ready to be added.
    pub concrete: Vec<Tag>,
    /// Geo and date tags pre-filled with a default value, awaiting confirmation.
    pub live: Vec<Tag>,
    /// Geo and date tags dropped because live tagging is unavailable.
    pub unavailable: Vec<Tag>,
}

/// Resolves generator tags at `now`. The input is not modified.
pub fn resolve_tags(tags: &[Tag], config: &TagConfig, now: NaiveDateTime) -> ResolvedTags {
    let mut resolved = ResolvedTags::default();
    for tag in tags {
        let mut tag = tag.clone();
        tag.strip_transient();
        tag.tag_type = TagType::Sidecar;

        match tag.functionality {
            Some(functionality) if functionality.is_live() => {
                if !config.live_tagging_available {
                    resolved.unavailable.push(tag);
                    continue;
                }
                tag.title = match functionality {
                    Functionality::GeoTagging => {
                        config.geo_tagging_format.default_location().to_string()
                    }
                    _ => format_datetime_tag(now),
                };
                resolved.live.push(tag);
                continue;
            }
            Some(functionality) => {
                if let Some(title) = functionality.resolve(now) {
                    tag.title = title;
                }
                tag.functionality = None;
                tag.color = None;
                tag.text_color = None;
                tag.icon = None;
                tag.description = None;
            }
            None => {}
        }

        if tag.title.is_empty() {
            debug!("Dropping tag without title");
            continue;
        }
        resolved.concrete.push(tag);
    }
    resolved
}

/// Keeps the tags whose title is neither in `filename_titles` nor in `sidecar_tags`, each title
/// at most once.
fn non_existing_tags(tags: &[Tag], filename_titles: &[String], sidecar_tags: &[Tag]) -> Vec<Tag> {
    let mut fresh: Vec<Tag> = Vec::new();
    for tag in tags {
        if filename_titles.iter().any(|t| *t == tag.title)
            || contains_title(sidecar_tags, &tag.title)
            || contains_title(&fresh, &tag.title)
        {
            continue;
        }
        fresh.push(tag.clone());
    }
    fresh
}

impl TagEngine {
    /// Adds `tags` to every entry in `paths`.
    ///
    /// Generator tags are resolved first. Geo and date tags are not added: once the concrete
    /// tags are in place, an [`EditTagRequested`] is emitted for each of them, pre-filled for
    /// the first path under the name it ends up with. All paths are attempted, concurrently.
    /// Returns true if at least one concrete tag was dispatched.
    #[instrument(skip(self, paths, tags), fields(paths = paths.len(), tags = tags.len()))]
    pub async fn add_tags(&self, paths: &[PathBuf], tags: &[Tag], update_index: bool) -> bool {
        let config = self.config();
        let now = chrono::Local::now().naive_local();
        let resolved = resolve_tags(tags, &config, now);

        if !resolved.unavailable.is_empty() {
            self.notify(NotificationKind::FunctionalityUnavailable, None);
        }

        let mut target = paths.first().cloned();
        let dispatched = !resolved.concrete.is_empty() && !paths.is_empty();
        if dispatched {
            let results = join_all(
                paths
                    .iter()
                    .map(|path| self.add_to_entry(path, &resolved.concrete, update_index, &config)),
            )
            .await;
            info!(
                "Tags added to {} of {} entries",
                results.iter().filter(|added| added.is_some()).count(),
                paths.len()
            );
            if let Some(Some(renamed)) = results.into_iter().next() {
                target = Some(renamed);
            }

            if config.add_tags_to_library {
                self.collect_into_library(&resolved.concrete, &config).await;
            }
        }

        for mut tag in resolved.live {
            tag.path = target.clone();
            let request = self.on.edit_tag_requested.emit(EditTagRequested {
                tag,
                handled: false,
            });
            if !request.handled {
                debug!("Nobody handled the edit request for '{}'", request.tag.title);
            }
        }
        dispatched
    }

    /// Adds the concrete `tags` to the entry at `path`.
    ///
    /// Tags whose title the entry already carries, in its file name or in its sidecar, are
    /// skipped. Returns true if the entry was changed.
    pub async fn add_tags_to_entry(&self, path: &Path, tags: &[Tag]) -> bool {
        let config = self.config();
        let tags: Vec<Tag> = tags
            .iter()
            .cloned()
            .map(|mut tag| {
                tag.strip_transient();
                tag
            })
            .collect();
        self.add_to_entry(path, &tags, true, &config).await.is_some()
    }

    /// Returns the entry's path after the change, or `None` if it was left unchanged.
    async fn add_to_entry(
        &self,
        path: &Path,
        tags: &[Tag],
        update_index: bool,
        config: &TagConfig,
    ) -> Option<PathBuf> {
        match self.try_add_to_entry(path, tags, update_index, config).await {
            Ok(changed) => changed,
            Err(e) => {
                warn!("Adding tags to '{}' failed: {}", path.display(), e);
                self.notify(NotificationKind::AddingTagsFailed, Some(path));
                None
            }
        }
    }

    #[instrument(skip(self, path, tags, config), fields(path = %path.display()))]
    async fn try_add_to_entry(
        &self,
        path: &Path,
        tags: &[Tag],
        update_index: bool,
        config: &TagConfig,
    ) -> Result<Option<PathBuf>> {
        let is_file = self.platform.properties(path).await?.is_file;
        // Only a missing record may be created from scratch
        let meta = self.store.load(path, is_file).await?;
        let filename_titles = if is_file {
            codec::decode_path(path, config.delimiter)?
        } else {
            Vec::new()
        };
        let sidecar_tags = meta.as_ref().map(|m| m.tags.as_slice()).unwrap_or_default();
        let new_tags = non_existing_tags(tags, &filename_titles, sidecar_tags);
        if new_tags.is_empty() {
            debug!("All tags already present");
            return Ok(None);
        }

        match config.representation(is_file) {
            Representation::Sidecar => {
                let created = meta.is_none();
                let mut meta = meta.unwrap_or_default();
                meta.tags.extend(new_tags);
                self.store.save(path, is_file, &mut meta).await?;
                self.propagate(path, &meta.tags, update_index, created);
                Ok(Some(path.to_path_buf()))
            }
            Representation::Filename => {
                let mut titles = filename_titles;
                codec::append_unique(&mut titles, new_tags.iter().map(|t| t.title.as_str()));
                let new_path = codec::encode_path(path, &titles, config.delimiter)?;
                if new_path == path {
                    return Ok(None);
                }
                let renamed = self.rename_entry(path, &new_path, is_file, config).await;
                Ok(renamed.then_some(new_path))
            }
        }
    }
}
