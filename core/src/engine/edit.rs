use std::path::Path;

use tracing::{debug, instrument, warn};

use super::{NotificationKind, TagEngine};
use crate::codec;
use crate::config::{Representation, TagConfig};
use crate::storage::{FileSystemEntryMeta, Result};
use crate::tag::{Tag, TagType, dedup_by_title};

/// Moves the element at `from` to `to`, clamping `to` to the end of the list.
fn move_to<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

impl TagEngine {
    /// Renames `tag` on the entry at `path` to `new_title` and/or moves it to `tag.position`.
    ///
    /// Without `new_title` the title stays the same. A blank title is rejected. A tag the entry does not carry yet is
    /// appended, ignoring `tag.position`. This is also how a confirmed geo or date tag
    /// (see [`EditTagRequested`](super::EditTagRequested)) gets added.
    #[instrument(skip(self, path, tag), fields(path = %path.display(), tag = %tag.title))]
    pub async fn edit_tag_for_entry(&self, path: &Path, tag: &Tag, new_title: Option<&str>) -> bool {
        let config = self.config();
        let new_title = new_title.unwrap_or(tag.title.as_str()).trim().to_string();
        if new_title.is_empty() {
            warn!("Refusing to give '{}' an empty title", tag.title);
            self.notify(NotificationKind::EditingTagFailed, Some(path));
            return false;
        }

        let result = match self.try_edit_tag(path, tag.clone(), &new_title, &config).await {
            Ok(edited) => edited,
            Err(e) => {
                warn!("Editing tag '{}' on '{}' failed: {}", tag.title, path.display(), e);
                self.notify(NotificationKind::EditingTagFailed, Some(path));
                false
            }
        };

        if config.add_tags_to_library {
            self.collect_into_library(&[Tag::new(new_title)], &config).await;
        }
        result
    }

    async fn try_edit_tag(&self, path: &Path, mut tag: Tag, new_title: &str, config: &TagConfig) -> Result<bool> {
        let is_file = self.platform.properties(path).await?.is_file;
        let representation = config.representation(is_file);

        let was_live = tag.functionality.is_some_and(|f| f.is_live());
        if was_live && representation == Representation::Filename {
            tag.tag_type = TagType::Plain;
        }
        let position = tag.position;
        tag.functionality = None;
        tag.description = None;
        tag.strip_transient();

        let titles = if is_file {
            codec::decode_path(path, config.delimiter)?
        } else {
            Vec::new()
        };
        let in_filename = titles.iter().any(|t| *t == tag.title);

        if in_filename || (was_live && tag.tag_type == TagType::Plain) {
            self.edit_filename_tag(path, titles, &tag, new_title, position, config)
                .await
        } else {
            self.edit_sidecar_tag(path, is_file, tag, new_title, position)
                .await
        }
    }

    async fn edit_filename_tag(
        &self,
        path: &Path,
        mut titles: Vec<String>,
        tag: &Tag,
        new_title: &str,
        position: Option<usize>,
        config: &TagConfig,
    ) -> Result<bool> {
        match titles.iter().position(|t| *t == tag.title) {
            Some(found) => {
                titles[found] = new_title.to_string();
                if let Some(position) = position {
                    move_to(&mut titles, found, position);
                }
            }
            None => titles.push(new_title.to_string()),
        }
        let mut seen = std::collections::HashSet::new();
        titles.retain(|t| seen.insert(t.clone()));

        let new_path = codec::encode_path(path, &titles, config.delimiter)?;
        if new_path == path {
            debug!("File name unchanged");
            return Ok(true);
        }
        Ok(self.rename_entry(path, &new_path, true, config).await)
    }

    async fn edit_sidecar_tag(
        &self,
        path: &Path,
        is_file: bool,
        tag: Tag,
        new_title: &str,
        position: Option<usize>,
    ) -> Result<bool> {
        let (mut meta, created) = match self.store.load(path, is_file).await {
            Ok(Some(meta)) => (meta, false),
            Ok(None) => (FileSystemEntryMeta::default(), true),
            Err(e) => {
                warn!("Replacing unreadable sidecar record: {}", e);
                (FileSystemEntryMeta::default(), true)
            }
        };

        let mut tags = std::mem::take(&mut meta.tags);
        match tags.iter().position(|t| t.title == tag.title) {
            Some(found) => {
                let existing = &mut tags[found];
                existing.title = new_title.to_string();
                if tag.color.is_some() {
                    existing.color = tag.color;
                }
                if tag.text_color.is_some() {
                    existing.text_color = tag.text_color;
                }
                if let Some(position) = position {
                    move_to(&mut tags, found, position);
                }
            }
            None => tags.push(Tag {
                title: new_title.to_string(),
                ..tag
            }),
        }
        meta.tags = dedup_by_title(tags);

        self.store.save(path, is_file, &mut meta).await?;
        self.propagate(path, &meta.tags, true, created);
        Ok(true)
    }
}
