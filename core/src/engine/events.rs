use std::path::PathBuf;

use crate::event::{Event, define_event_listeners};
use crate::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The conditions the engine reports to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AddingTagsFailed,
    EditingTagFailed,
    RemovingSidecarTagsFailed,
    RemovingTagsInSidecarFileFailed,
    RenamingFailed,
    /// A geo or date tag was requested without the capability to resolve it.
    FunctionalityUnavailable,
    /// Tag collection was requested before anything was indexed.
    IndexLocationFirst,
    CollectingTagsFailed,
}

impl NotificationKind {
    pub fn message(self) -> &'static str {
        match self {
            NotificationKind::AddingTagsFailed => "Adding tags failed",
            NotificationKind::EditingTagFailed => "Editing tag failed",
            NotificationKind::RemovingSidecarTagsFailed => "Removing sidecar tags failed",
            NotificationKind::RemovingTagsInSidecarFileFailed => {
                "Removing tags in the sidecar file failed"
            }
            NotificationKind::RenamingFailed => "Renaming failed",
            NotificationKind::FunctionalityUnavailable => {
                "This functionality is not available in this edition"
            }
            NotificationKind::IndexLocationFirst => "Please index the location first",
            NotificationKind::CollectingTagsFailed => "Collecting tags failed",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            NotificationKind::FunctionalityUnavailable | NotificationKind::IndexLocationFirst => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Entry the notification is about, if any.
    pub path: Option<PathBuf>,
    pub severity: Severity,
    pub auto_hide: bool,
}

impl Notification {
    pub fn new(kind: NotificationKind, path: Option<PathBuf>) -> Self {
        Notification {
            kind,
            path,
            severity: kind.severity(),
            auto_hide: true,
        }
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl Event for Notification {
    type HandlerReturnType = ();
}

/// The sidecar tags of an entry were persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsChanged {
    pub path: PathBuf,
    pub tags: Vec<Tag>,
}

impl Event for TagsChanged {
    type HandlerReturnType = ();
}

/// An entry was renamed to change its filename tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRenamed {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Event for EntryRenamed {
    type HandlerReturnType = ();
}

/// A geo or date tag needs the user to confirm its value before it is added.
///
/// `tag.path` holds the entry the tag is meant for and `tag.title` the pre-filled value. The
/// confirmed tag goes back through [`TagEngine::edit_tag_for_entry`](super::TagEngine::edit_tag_for_entry).
/// Listeners return true if they took care of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTagRequested {
    pub tag: Tag,
    pub handled: bool,
}

impl Event for EditTagRequested {
    type HandlerReturnType = bool;

    fn update(&mut self, handled: bool) {
        self.handled |= handled;
    }
}

define_event_listeners!(
    /// Listener lists for everything the engine emits.
    EngineEvents {
        notification: Notification,
        tags_changed: TagsChanged,
        entry_renamed: EntryRenamed,
        edit_tag_requested: EditTagRequested,
    }
);
