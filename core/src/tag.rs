use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the tag group that collects tags gathered from usage.
///
/// The value never changes so that repeated collection runs merge into the same group.
pub const COLLECTED_TAGS_GROUP_ID: &str = "collected_tag_group_id";
pub const COLLECTED_TAGS_GROUP_TITLE: &str = "Collected Tags";

/// Records which representation a tag was read from.
///
/// This is informational only. Where a tag is written to is decided by the engine's
/// representation policy, not by this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    #[default]
    Sidecar,
    Plain,
}

/// Generator kinds for tags whose title is computed when they are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Functionality {
    Today,
    Tomorrow,
    Yesterday,
    CurrentMonth,
    CurrentYear,
    Now,
    /// Opens an edit dialog pre-filled with a reference coordinate.
    GeoTagging,
    /// Opens an edit dialog pre-filled with the current date and time.
    DateTagging,
    /// Any functionality this version does not know about.
    #[serde(other)]
    NoOp,
}

impl Functionality {
    /// Geo and date tagging are resolved interactively instead of being added directly.
    pub fn is_live(self) -> bool {
        matches!(self, Functionality::GeoTagging | Functionality::DateTagging)
    }

    /// Computes the concrete title for this functionality at `now`.
    ///
    /// Returns `None` for the live kinds and for [`Functionality::NoOp`], in which case the
    /// tag keeps whatever title it already carries.
    pub fn resolve(self, now: NaiveDateTime) -> Option<String> {
        match self {
            Functionality::Today => Some(format_date_tag(now.date())),
            Functionality::Tomorrow => now.date().succ_opt().map(format_date_tag),
            Functionality::Yesterday => now.date().pred_opt().map(format_date_tag),
            Functionality::CurrentMonth => Some(now.format("%Y%m").to_string()),
            Functionality::CurrentYear => Some(now.format("%Y").to_string()),
            Functionality::Now => Some(format_datetime_tag(now)),
            Functionality::GeoTagging | Functionality::DateTagging | Functionality::NoOp => None,
        }
    }
}

/// Formats a date the way date tags are written, e.g. `20240131`.
pub fn format_date_tag(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Formats a date and time the way date tags are written, e.g. `20240131T154500`.
pub fn format_datetime_tag(datetime: NaiveDateTime) -> String {
    datetime.format("%Y%m%dT%H%M%S").to_string()
}

/// A descriptive label attached to a file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "textcolor", default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(rename = "type", default)]
    pub tag_type: TagType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functionality: Option<Functionality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target index, only used while editing or reordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Entry the tag is being edited for, only set on edit dialog requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Tag {
    pub fn new(title: impl Into<String>) -> Self {
        Tag {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Creates a tag as decoded from an entry's file name.
    pub fn plain(title: impl Into<String>) -> Self {
        Tag {
            title: title.into(),
            tag_type: TagType::Plain,
            ..Default::default()
        }
    }

    /// Creates a generator tag. Its title is filled in on resolution.
    pub fn with_functionality(functionality: Functionality) -> Self {
        Tag {
            functionality: Some(functionality),
            ..Default::default()
        }
    }

    pub fn colored(mut self, color: impl Into<String>, text_color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self.text_color = Some(text_color.into());
        self
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Clears the fields that only make sense while a tag is in flight.
    pub(crate) fn strip_transient(&mut self) {
        self.position = None;
        self.path = None;
    }
}

/// Removes tags whose title already occurred earlier in the list.
pub fn dedup_by_title(tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.title.clone()))
        .collect()
}

/// Returns true if any tag in `tags` carries `title`.
pub fn contains_title(tags: &[Tag], title: &str) -> bool {
    tags.iter().any(|tag| tag.title == title)
}

/// A named, colored group of tags in the tag library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub uuid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "textcolor", default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default)]
    pub children: Vec<Tag>,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "created_date", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(rename = "modified_date", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<i64>,
}

impl TagGroup {
    /// Creates an empty group with a fresh random identity.
    pub fn new(title: impl Into<String>) -> Self {
        TagGroup {
            uuid: Uuid::new_v4().to_string(),
            title: title.into(),
            color: None,
            text_color: None,
            children: Vec::new(),
            created_at: None,
            modified_at: None,
        }
    }

    /// Creates the reserved group that receives tags collected from usage.
    pub fn collected(color: Option<String>, text_color: Option<String>, children: Vec<Tag>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        TagGroup {
            uuid: COLLECTED_TAGS_GROUP_ID.to_string(),
            title: COLLECTED_TAGS_GROUP_TITLE.to_string(),
            color,
            text_color,
            children,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }

    pub fn contains(&self, title: &str) -> bool {
        contains_title(&self.children, title)
    }
}
