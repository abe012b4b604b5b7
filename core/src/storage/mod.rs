//! Sidecar metadata storage for files and directories.
//!
//! Every tagged entry may own one sidecar record: a small JSON document that carries the
//! entry's tags (and any other metadata written by other tools, which is preserved as-is).
//! Records live in a hidden `.ts` directory next to the entry:
//!
//! *   **File** `photos/beach.jpg` → `photos/.ts/beach.jpg.json`
//! *   **Directory** `photos/` → `photos/.ts/tsm.json`
//!
//! The record shape is the same for both, only its location differs.
//!
//! # Not Found
//!
//! A missing record is not an error. [`SidecarStore::load`] returns `Ok(None)` in that case,
//! which callers treat as "no tags yet" and switch to creating a fresh record on first write.
//! Any other failure (unreadable file, malformed JSON, failing backend) is reported as an
//! [`Error`].
//!
//! # Backends
//!
//! Raw bytes are read and written through a [`MetadataBackend`]. [`LocalBackend`] uses the
//! local filesystem through `tokio::fs`; other backends (object stores, in-memory fixtures)
//! can be plugged in by implementing the trait.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use sidetag_core::storage::{FileSystemEntryMeta, LocalBackend, SidecarStore};
//! use sidetag_core::tag::Tag;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SidecarStore::new(Arc::new(LocalBackend));
//!     let path = Path::new("notes/todo.md");
//!
//!     let mut meta = store.load(path, true).await?.unwrap_or_default();
//!     meta.tags.push(Tag::new("urgent"));
//!     store.save(path, true, &mut meta).await?;
//!     Ok(())
//! }
//! ```

pub use self::backend::{LocalBackend, MetadataBackend};
pub use self::metadata::FileSystemEntryMeta;
pub use self::sidecar::SidecarStore;

mod backend;
mod metadata;
mod sidecar;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the hidden directory holding sidecar records.
pub const META_FOLDER: &str = ".ts";
/// Extension appended to a file's name to form its sidecar record's name.
pub const META_FILE_EXTENSION: &str = "json";
/// Name of a directory's own sidecar record inside its `.ts` folder.
pub const FOLDER_META_FILE: &str = "tsm.json";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Path does not have a valid parent directory: {0}")]
    NoParentDirectory(PathBuf),

    #[error("Path does not have a valid UTF-8 file name: {0}")]
    NoFileName(PathBuf),

    #[error("Metadata serialization/deserialization error")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Target already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Configuration file is invalid: {0}")]
    InvalidConfig(PathBuf),
}

// Define a standard Result type for the library
pub type Result<T> = std::result::Result<T, Error>;
