//! Gathers tag titles from usage into a reusable library group.

use std::collections::HashSet;

use crate::geo::{is_geo_tag, is_pseudo_numeric};
use crate::index::IndexedEntry;
use crate::tag::{Tag, TagGroup};

/// Colors given to collected tags that carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStyle {
    pub color: String,
    pub text_color: String,
}

/// Returns true if a tag with `title` is worth keeping in the library.
///
/// Numbers, numeric ranges and coordinates are too specific to be reused.
pub fn is_collectable(title: &str) -> bool {
    !title.is_empty() && !is_pseudo_numeric(title) && !is_geo_tag(title)
}

/// Selects the tags of `tags` that none of `known` contains yet.
///
/// Each title is selected once, at its first occurrence. Only title and colors are carried
/// over, missing colors are taken from `style`.
pub fn select_new_tags<'a>(
    tags: impl IntoIterator<Item = &'a Tag>,
    known: &[TagGroup],
    style: &TagStyle,
) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| is_collectable(&tag.title))
        .filter(|tag| !known.iter().any(|group| group.contains(&tag.title)))
        .filter(|tag| seen.insert(tag.title.clone()))
        .map(|tag| Tag {
            title: tag.title.clone(),
            color: Some(tag.color.clone().unwrap_or_else(|| style.color.clone())),
            text_color: Some(tag.text_color.clone().unwrap_or_else(|| style.text_color.clone())),
            ..Default::default()
        })
        .collect()
}

/// Collects the tags used by `entries` that `group` does not hold yet, in index order.
pub fn collect_tags(entries: &[IndexedEntry], group: &TagGroup, style: &TagStyle) -> Vec<Tag> {
    select_new_tags(
        entries.iter().flat_map(|entry| entry.tags.iter()),
        std::slice::from_ref(group),
        style,
    )
}
