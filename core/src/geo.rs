//! Recognizers for tags that hold geographic coordinates.
//!
//! Two encodings are recognized: Open Location Codes ("plus codes", e.g. `9F32F2H2+X2`) and
//! Military Grid Reference System strings (e.g. `31UBT9169107473`). Only the syntax is
//! checked. Nothing is decoded into coordinates.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const OLC_ALPHABET: &str = "23456789CFGHJMPQRVWX";
const OLC_SEPARATOR: char = '+';
const OLC_SEPARATOR_POSITION: usize = 8;
const OLC_PADDING: char = '0';

/// Plus code of the reference coordinate (51.48 N, 0 E) used to pre-fill geo tags.
pub const DEFAULT_OLC_LOCATION: &str = "9F32F2H2+X2";
/// MGRS string of the reference coordinate (51.48 N, 0 E) used to pre-fill geo tags.
pub const DEFAULT_MGRS_LOCATION: &str = "31UBT9169107473";

// Zone, latitude band, 100km square, then an even number of digits (up to 1m precision)
static MGRS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[C-HJ-NP-X][A-HJ-NP-Z][A-HJ-NP-V]((?:\d\d){0,5})$").unwrap()
});

static PSEUDO_NUMERIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+~\d+|\d+)$").unwrap());

/// Encoding used for newly created geo tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeoTaggingFormat {
    #[default]
    OpenLocationCode,
    Mgrs,
}

impl GeoTaggingFormat {
    /// Title a new geo tag is pre-filled with.
    pub fn default_location(self) -> &'static str {
        match self {
            GeoTaggingFormat::OpenLocationCode => DEFAULT_OLC_LOCATION,
            GeoTaggingFormat::Mgrs => DEFAULT_MGRS_LOCATION,
        }
    }
}

/// Returns true if `title` is a syntactically valid Open Location Code, full or short.
pub fn is_plus_code(title: &str) -> bool {
    if title.len() < 2 {
        return false;
    }
    let Some(separator) = title.find(OLC_SEPARATOR) else {
        return false;
    };
    if title.rfind(OLC_SEPARATOR) != Some(separator) {
        return false;
    }
    if separator > OLC_SEPARATOR_POSITION || separator % 2 == 1 {
        return false;
    }

    if let Some(first_pad) = title.find(OLC_PADDING) {
        // Padding is only allowed in full codes, as a single even run that ends at the separator
        if separator < OLC_SEPARATOR_POSITION || first_pad == 0 {
            return false;
        }
        let pad_len = title[first_pad..].chars().take_while(|&c| c == OLC_PADDING).count();
        if title[first_pad + pad_len..].contains(OLC_PADDING)
            || pad_len % 2 == 1
            || pad_len > OLC_SEPARATOR_POSITION - 2
        {
            return false;
        }
        if !title.ends_with(OLC_SEPARATOR) {
            return false;
        }
    }

    if title.len() - separator - 1 == 1 {
        return false;
    }

    title
        .chars()
        .filter(|&c| c != OLC_SEPARATOR && c != OLC_PADDING)
        .all(|c| OLC_ALPHABET.contains(c.to_ascii_uppercase()))
}

/// Returns true if `title` is a syntactically valid MGRS grid reference.
pub fn is_mgrs(title: &str) -> bool {
    let compact: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let Some(captures) = MGRS_PATTERN.captures(&compact) else {
        return false;
    };
    matches!(captures[1].parse::<u8>(), Ok(1..=60))
}

/// Returns true if `title` holds a geographic coordinate in either supported encoding.
pub fn is_geo_tag(title: &str) -> bool {
    is_plus_code(title) || is_mgrs(title)
}

/// Returns true for titles made of digits only, or a `digits~digits` range.
pub fn is_pseudo_numeric(title: &str) -> bool {
    PSEUDO_NUMERIC_PATTERN.is_match(title)
}
