//! iabrowse - Internet Archive catalog browser
//!
//! Presents the archive.org catalog as a navigable tree of pages backed by
//! the public search and metadata APIs, with a locally persisted favorites
//! list.
//!
//! # Architecture
//!
//! - Searches are ranked by downloads and fetched in fixed-size pages
//! - A page loader turns those pages into one incremental listing
//! - Favorites are one JSON list in a plugin-scoped key-value store
//!
//! # Modules
//!
//! - `adapters`: External catalog integrations (archive.org)
//! - `core`: Pages, routes, pagination and route handlers
//! - `domain`: Data structures (CatalogRecord, ItemDetail, MediaFile)
//! - `library`: Key-value stores and the favorites list
//! - `cli`: Terminal host
//!
//! # Usage
//!
//! ```bash
//! # Home page with the discovery section
//! iabrowse home
//!
//! # Search, loading three pages
//! iabrowse search "title:(nosferatu)" --pages 3
//!
//! # Files of one item, then pin it
//! iabrowse files night_of_the_living_dead
//! iabrowse favorites add night_of_the_living_dead
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use crate::adapters::{ArchiveClient, CatalogSource, FetchError, SearchRequest};
pub use crate::core::{Browser, Page, PageItem, PageLoader, Route, RoutedPage};
pub use crate::domain::{CatalogRecord, ItemDetail, MediaFile, MediaKind, MediaType, SearchPage};
pub use crate::library::{Favorite, FavoritesError, FavoritesStore, KeyValueStore};
