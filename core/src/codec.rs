//! Encoding of tag lists into file names.
//!
//! Tags live in a single container appended to the file's title, separated by a
//! configurable delimiter:
//!
//! ```text
//! report.txt            no tags
//! report[done].txt      one tag
//! report[done next].txt two tags, delimiter ' '
//! ```
//!
//! The container starts at the first `[` and ends at the last `]` of the name without its
//! extension. A final `.` that lies inside the container does not start an extension, so
//! `notes[v1.2]` has no extension.
//!
//! Decoding is the inverse of encoding for any non-empty tag titles that do not contain the
//! delimiter, as long as the title part of the name holds no `[` of its own. A stray `[` in
//! the title is taken as the start of the container.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::storage::{Error, Result};

pub const BEGIN_TAG_CONTAINER: char = '[';
pub const END_TAG_CONTAINER: char = ']';

/// Splits a file name into the part before the extension and the extension itself.
fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        // Dot files such as `.profile` have no extension
        None | Some(0) => (file_name, None),
        Some(pos) => {
            let ext = &file_name[pos + 1..];
            if ext.contains(END_TAG_CONTAINER) {
                (file_name, None)
            } else {
                (&file_name[..pos], Some(ext))
            }
        }
    }
}

/// Byte range of the tag container (inclusive of both brackets) in `stem`.
fn tag_container(stem: &str) -> Option<(usize, usize)> {
    let begin = stem.find(BEGIN_TAG_CONTAINER)?;
    let end = stem.rfind(END_TAG_CONTAINER)?;
    (begin < end).then_some((begin, end))
}

/// Decodes the tag titles encoded in `file_name`, in the order they appear.
pub fn decode(file_name: &str, delimiter: char) -> Vec<String> {
    let (stem, _) = split_extension(file_name);
    match tag_container(stem) {
        Some((begin, end)) => stem[begin + 1..end]
            .split(delimiter)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Returns the title of `file_name`: the name without tag container and extension.
pub fn extract_title(file_name: &str) -> String {
    let (stem, _) = split_extension(file_name);
    match tag_container(stem) {
        Some((begin, end)) => format!("{}{}", &stem[..begin], &stem[end + 1..])
            .trim()
            .to_string(),
        None => stem.to_string(),
    }
}

/// Rewrites `file_name` so that it carries exactly `titles`, in order.
///
/// An existing tag container is replaced. With an empty list the container is dropped
/// altogether, and a name that had no container comes back unchanged.
pub fn encode<S: AsRef<str>>(file_name: &str, titles: &[S], delimiter: char) -> String {
    let (stem, ext) = split_extension(file_name);

    let mut name = match tag_container(stem) {
        Some((begin, end)) => {
            let title = format!("{}{}", &stem[..begin], &stem[end + 1..]);
            if titles.is_empty() {
                title.trim_end().to_string()
            } else {
                title
            }
        }
        None => stem.to_string(),
    };

    if !titles.is_empty() {
        name.push(BEGIN_TAG_CONTAINER);
        let joined = titles
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(&delimiter.to_string());
        name.push_str(&joined);
        name.push(END_TAG_CONTAINER);
    }

    if let Some(ext) = ext {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Appends the titles not yet present in `existing`, keeping their order.
///
/// Returns the number of titles that were appended.
pub fn append_unique<'a>(existing: &mut Vec<String>, titles: impl IntoIterator<Item = &'a str>) -> usize {
    let mut added = 0;
    for title in titles {
        if !existing.iter().any(|t| t == title) {
            existing.push(title.to_string());
            added += 1;
        }
    }
    added
}

/// Returns the final component of `path` as UTF-8.
pub fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| Error::NoFileName(path.to_path_buf()))
}

/// Decodes the tag titles encoded in the file name of `path`.
pub fn decode_path(path: &Path, delimiter: char) -> Result<Vec<String>> {
    Ok(decode(file_name(path)?, delimiter))
}

/// Computes the path `path` would have if its name carried exactly `titles`.
pub fn encode_path<S: AsRef<str>>(path: &Path, titles: &[S], delimiter: char) -> Result<PathBuf> {
    let name = file_name(path)?;
    Ok(path.with_file_name(encode(name, titles, delimiter)))
}
