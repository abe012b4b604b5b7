//! Tag files and folders without a database.
//!
//! Tags are either encoded into an entry's file name (`report[done next].txt`) or kept in a
//! sidecar JSON record next to it. [`engine::TagEngine`] decides which one applies and keeps
//! both consistent, along with the open-file cache and the search index of the host.

pub mod codec;
pub mod config;
pub mod engine;
pub mod event;
pub mod geo;
pub mod index;
pub mod library;
pub mod opened_files;
pub mod platform;
pub mod storage;
pub mod tag;

pub use engine::TagEngine;
pub use tag::{Functionality, Tag, TagGroup, TagType};
