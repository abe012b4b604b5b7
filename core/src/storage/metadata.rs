use clap::crate_version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tag::Tag;

const APP_NAME: &str = "Sidetag";

/// Contents of one sidecar record.
///
/// Only `tags` is interpreted here. Keys written by other tools are kept in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEntryMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    /// Milliseconds since the Unix epoch of the last save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileSystemEntryMeta {
    /// Creates a record holding only `tags`.
    pub fn with_tags(tags: Vec<Tag>) -> Self {
        FileSystemEntryMeta {
            tags,
            ..Default::default()
        }
    }

    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    /// Stamps the record with the writing application and the current time.
    pub(crate) fn touch(&mut self) {
        self.app_name = Some(APP_NAME.to_string());
        self.app_version = Some(crate_version!().to_string());
        self.last_updated = Some(chrono::Utc::now().timestamp_millis());
    }
}
