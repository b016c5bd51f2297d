//! Catalog records returned by the archive search endpoint.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Media type of an archive item as reported by the `mediatype` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Moving images (`movies`)
    Movies,

    /// Audio recordings (`audio`)
    Audio,

    /// Anything else (texts, software, collections, ...)
    Other,
}

impl MediaType {
    /// Map the raw archive `mediatype` string
    pub fn from_archive(raw: &str) -> Self {
        match raw {
            "movies" => MediaType::Movies,
            "audio" => MediaType::Audio,
            _ => MediaType::Other,
        }
    }

    /// Filter accepted by the browse and search listings
    pub fn playable() -> HashSet<MediaType> {
        [MediaType::Movies, MediaType::Audio].into_iter().collect()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movies => write!(f, "movies"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Other => write!(f, "other"),
        }
    }
}

/// One normalized search-result entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Opaque archive.org identifier
    pub identifier: String,

    /// Display title
    pub title: String,

    /// Media type of the item
    pub media_type: MediaType,
}

impl CatalogRecord {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            media_type,
        }
    }
}

/// Outcome of one search page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Records that passed the media type filter, in server order
    pub records: Vec<CatalogRecord>,

    /// `numFound` reported by the server
    pub total_found: u64,

    /// True when the raw document list was non-empty, before filtering
    pub has_more: bool,
}
