//! Item detail and downloadable media files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::record::MediaType;

/// Kind of a playable file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a file name by extension (case-insensitive).
    ///
    /// Returns `None` for anything that is not a recognized media file.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "avi" | "3gp" => Some(MediaKind::Video),
            "mp3" | "ogg" | "m4a" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

/// A downloadable file of an archive item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// File name as listed in the metadata document
    pub name: String,

    /// Absolute download URL
    pub url: String,

    pub kind: MediaKind,
}

/// Metadata of one archive item, filtered to playable files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub identifier: String,
    pub title: String,
    pub media_type: MediaType,

    /// Recognized media files in source order
    pub files: Vec<MediaFile>,

    /// Number of files in the document before filtering
    pub total_files: usize,
}

impl ItemDetail {
    /// Why the file listing is empty, if it is
    pub fn empty_reason(&self) -> Option<EmptyListing> {
        if self.total_files == 0 {
            Some(EmptyListing::NoFiles)
        } else if self.files.is_empty() {
            Some(EmptyListing::NoMediaFiles)
        } else {
            None
        }
    }
}

/// Empty-state of a file listing. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyListing {
    /// The item has no files at all
    NoFiles,

    /// The item has files, none of a recognized media type
    NoMediaFiles,
}

impl EmptyListing {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyListing::NoFiles => "No files found in the selected item.",
            EmptyListing::NoMediaFiles => "No media files found in the selected item.",
        }
    }
}
