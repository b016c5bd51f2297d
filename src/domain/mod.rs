//! Domain types for the catalog browser.
//!
//! This module contains the core data structures:
//! - CatalogRecord: One search result
//! - ItemDetail: One item with its playable files

pub mod item;
pub mod record;

// Re-export commonly used types
pub use item::{EmptyListing, ItemDetail, MediaFile, MediaKind};
pub use record::{CatalogRecord, MediaType, SearchPage};
