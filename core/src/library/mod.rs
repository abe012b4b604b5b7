//! The tag library: named groups of reusable tags.
//!
//! Groups are identified by their uuid. Merging a group whose uuid is already present unions
//! its children into the existing group instead of adding a second one, which is how the
//! reserved "Collected Tags" group accumulates across collection runs.

pub mod collector;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::storage::{Error, Result};
use crate::tag::{Tag, TagGroup, dedup_by_title};

#[async_trait]
pub trait TagLibrary: fmt::Debug + Send + Sync {
    async fn tag_groups(&self) -> Result<Vec<TagGroup>>;

    /// Adds `group` to the library, or merges it into the group with the same uuid.
    async fn merge_tag_group(&self, group: TagGroup) -> Result<()>;
}

/// Merges `group` into `library`. `now` is in milliseconds since the Unix epoch.
pub fn merge_tag_group(library: &mut Vec<TagGroup>, mut group: TagGroup, now: i64) {
    match library.iter_mut().find(|g| g.uuid == group.uuid) {
        Some(existing) => {
            let mut children = std::mem::take(&mut existing.children);
            children.extend(group.children);
            children.sort_by(|a, b| a.title.cmp(&b.title));
            existing.children = dedup_by_title(children);
            existing.modified_at = Some(now);
        }
        None => {
            group.created_at.get_or_insert(now);
            group.modified_at.get_or_insert(now);
            library.push(group);
        }
    }
}

/// On-disk envelope of the library, also used for import and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLibraryFile {
    #[serde(default)]
    pub tag_groups: Vec<TagGroup>,
}

fn default_group(title: &str, color: &str, text_color: &str, titles: &[&str]) -> TagGroup {
    let mut group = TagGroup::new(title);
    group.color = Some(color.to_string());
    group.text_color = Some(text_color.to_string());
    group.children = titles
        .iter()
        .map(|t| Tag::new(*t).colored(color, text_color))
        .collect();
    group
}

/// The groups a fresh library starts with.
pub fn default_tag_groups() -> Vec<TagGroup> {
    let mut priorities = TagGroup::new("Priorities");
    priorities.color = Some("#008000".to_string());
    priorities.text_color = Some("#ffffff".to_string());
    priorities.children = vec![
        Tag::new("high").colored("#ff7537", "#ffffff"),
        Tag::new("medium").colored("#ffad46", "#ffffff"),
        Tag::new("low").colored("#7bd148", "#ffffff"),
    ];

    vec![
        default_group(
            "ToDo Workflow",
            "#008000",
            "#ffffff",
            &["done", "next", "maybe", "waiting", "todo"],
        ),
        default_group("Common Tags", "#008000", "#ffffff", &["book", "paper", "article"]),
        priorities,
        default_group(
            "Ratings",
            "#ffcc24",
            "#ffffff",
            &["1star", "2star", "3star", "4star", "5star"],
        ),
    ]
}

/// In-memory [`TagLibrary`].
#[derive(Debug, Default)]
pub struct MemoryTagLibrary {
    groups: Mutex<Vec<TagGroup>>,
}

impl MemoryTagLibrary {
    pub fn new(groups: Vec<TagGroup>) -> Self {
        MemoryTagLibrary {
            groups: Mutex::new(groups),
        }
    }
}

#[async_trait]
impl TagLibrary for MemoryTagLibrary {
    async fn tag_groups(&self) -> Result<Vec<TagGroup>> {
        Ok(self.groups.lock().await.clone())
    }

    async fn merge_tag_group(&self, group: TagGroup) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        merge_tag_group(&mut *self.groups.lock().await, group, now);
        Ok(())
    }
}

/// [`TagLibrary`] persisted as a JSON file.
///
/// The file is read on first use. If it does not exist the library starts with
/// [`default_tag_groups`]; the file is only created by the first change.
#[derive(Debug)]
pub struct JsonTagLibrary {
    path: PathBuf,
    groups: Mutex<Option<Vec<TagGroup>>>,
}

impl JsonTagLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonTagLibrary {
            path: path.into(),
            groups: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(path: &Path) -> Result<Vec<TagGroup>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No tag library at {}, starting with defaults", path.display());
                return Ok(default_tag_groups());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let file: TagLibraryFile = serde_json::from_slice(&content).map_err(|e| {
            warn!("Failed to parse tag library '{}': {}", path.display(), e);
            Error::Metadata(e)
        })?;
        Ok(file.tag_groups)
    }

    async fn write(&self, groups: &[TagGroup]) -> Result<()> {
        let file = TagLibraryFile {
            tag_groups: groups.to_vec(),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&file)?).await?;
        debug!("Tag library written to {}", self.path.display());
        Ok(())
    }

    /// Applies `change` to the loaded groups and persists the result.
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<TagGroup>) + Send,
    {
        let mut guard = self.groups.lock().await;
        let mut groups = match guard.take() {
            Some(groups) => groups,
            None => Self::read(&self.path).await?,
        };
        change(&mut groups);
        let written = self.write(&groups).await;
        *guard = Some(groups);
        written
    }

    /// Adds `groups` to the library. With `replace` the current groups are discarded first.
    #[instrument(skip(self, groups), fields(path = %self.path.display(), count = groups.len()))]
    pub async fn import_tag_groups(&self, groups: Vec<TagGroup>, replace: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.update(move |library| {
            if replace {
                library.clear();
            }
            for group in groups {
                merge_tag_group(library, group, now);
            }
        })
        .await?;
        info!("Tag groups imported");
        Ok(())
    }

    pub async fn export_tag_groups(&self) -> Result<TagLibraryFile> {
        Ok(TagLibraryFile {
            tag_groups: self.tag_groups().await?,
        })
    }
}

#[async_trait]
impl TagLibrary for JsonTagLibrary {
    async fn tag_groups(&self) -> Result<Vec<TagGroup>> {
        let mut guard = self.groups.lock().await;
        if guard.is_none() {
            *guard = Some(Self::read(&self.path).await?);
        }
        Ok(guard.clone().unwrap_or_default())
    }

    #[instrument(skip(self, group), fields(path = %self.path.display(), group = %group.title))]
    async fn merge_tag_group(&self, group: TagGroup) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.update(move |library| merge_tag_group(library, group, now))
            .await
    }
}
