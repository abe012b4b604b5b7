//! User settings and the per-operation configuration snapshot derived from them.
//!
//! [`Settings`] is what gets persisted (a camelCase JSON file). The engine never reads it
//! directly: each batch operation works on a [`TagConfig`] captured once at its start, so a
//! settings change mid-batch cannot lead to mixed decisions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::geo::GeoTaggingFormat;
use crate::storage::{Error, Result};

pub const DEFAULT_TAG_DELIMITER: char = ' ';
pub const DEFAULT_TAG_COLOR: &str = "#61DD61";
pub const DEFAULT_TAG_TEXT_COLOR: &str = "#FFFFFF";

/// A folder the user works in, optionally with its own persistence policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationConfig {
    pub name: String,
    pub path: PathBuf,
    /// Overrides [`Settings::persist_tags_in_sidecar_file`] for entries in this location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_tags_in_sidecar_file: Option<bool>,
}

impl LocationConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        LocationConfig {
            name: name.into(),
            path: path.into(),
            persist_tags_in_sidecar_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub tag_delimiter: char,
    pub persist_tags_in_sidecar_file: bool,
    pub add_tags_to_library: bool,
    pub tag_background_color: String,
    pub tag_text_color: String,
    pub geo_tagging_format: GeoTaggingFormat,
    /// Whether geo and date tags can be resolved through an edit dialog.
    pub live_tagging_available: bool,
    pub locations: Vec<LocationConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tag_delimiter: DEFAULT_TAG_DELIMITER,
            persist_tags_in_sidecar_file: false,
            add_tags_to_library: true,
            tag_background_color: DEFAULT_TAG_COLOR.to_string(),
            tag_text_color: DEFAULT_TAG_TEXT_COLOR.to_string(),
            geo_tagging_format: GeoTaggingFormat::default(),
            live_tagging_available: false,
            locations: Vec::new(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        serde_json::from_slice(&content).map_err(|e| {
            warn!("Failed to parse settings file '{}': {}", path.display(), e);
            Error::InvalidConfig(path.to_path_buf())
        })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        debug!("Settings written to {}", path.display());
        Ok(())
    }

    /// Returns the most specific location containing `path`.
    pub fn location_for(&self, path: &Path) -> Option<&LocationConfig> {
        self.locations
            .iter()
            .filter(|location| path.starts_with(&location.path))
            .max_by_key(|location| location.path.components().count())
    }

    /// Captures the configuration for one batch operation in `location`.
    pub fn snapshot(&self, location: Option<&LocationConfig>) -> TagConfig {
        TagConfig {
            delimiter: self.tag_delimiter,
            persist_tags_in_sidecar_file: self.persist_tags_in_sidecar_file,
            location_override: location.and_then(|l| l.persist_tags_in_sidecar_file),
            add_tags_to_library: self.add_tags_to_library,
            tag_color: self.tag_background_color.clone(),
            tag_text_color: self.tag_text_color.clone(),
            geo_tagging_format: self.geo_tagging_format,
            live_tagging_available: self.live_tagging_available,
        }
    }

    /// Captures the configuration for a batch touching `path`.
    pub fn snapshot_for(&self, path: &Path) -> TagConfig {
        self.snapshot(self.location_for(path))
    }
}

/// Where an entry's tags are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Encoded into the entry's file name.
    Filename,
    /// Stored in the entry's sidecar record.
    Sidecar,
}

impl Representation {
    /// Directories always use the sidecar. Files follow the location override if there is one,
    /// the global setting otherwise.
    pub fn select(is_file: bool, location_override: Option<bool>, global: bool) -> Self {
        if !is_file || location_override.unwrap_or(global) {
            Representation::Sidecar
        } else {
            Representation::Filename
        }
    }
}

/// Immutable configuration captured at the start of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    pub delimiter: char,
    pub persist_tags_in_sidecar_file: bool,
    pub location_override: Option<bool>,
    pub add_tags_to_library: bool,
    pub tag_color: String,
    pub tag_text_color: String,
    pub geo_tagging_format: GeoTaggingFormat,
    pub live_tagging_available: bool,
}

impl TagConfig {
    pub fn representation(&self, is_file: bool) -> Representation {
        Representation::select(is_file, self.location_override, self.persist_tags_in_sidecar_file)
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Settings::default().snapshot(None)
    }
}
