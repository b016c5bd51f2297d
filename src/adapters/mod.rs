//! Adapter interfaces for the external catalog.
//!
//! Adapters provide a unified interface for querying a remote catalog.
//! The only production adapter talks to archive.org.

pub mod archive;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ItemDetail, MediaType, SearchPage};

// Re-export the archive.org adapter
pub use archive::{ArchiveClient, DEFAULT_BASE_URL};

/// Errors from a catalog fetch. Every variant is fatal to the current
/// request; nothing retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),
}

/// Parameters of one search page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw archive query, e.g. `mediatype:(movies OR audio)`
    pub query: String,

    /// Media types kept after the response arrives
    pub media_types: HashSet<MediaType>,

    /// 1-based page number
    pub page: u32,

    /// Rows requested per page
    pub rows: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, media_types: HashSet<MediaType>, rows: u32) -> Self {
        Self {
            query: query.into(),
            media_types,
            page: 1,
            rows,
        }
    }

    /// Same request for another page
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// Trait for catalog backends
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Fetch one page of ranked search results
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, FetchError>;

    /// Fetch one item's metadata and playable files
    async fn fetch_item_detail(&self, identifier: &str) -> Result<ItemDetail, FetchError>;

    /// Thumbnail URL for an item
    fn thumbnail_url(&self, identifier: &str) -> String {
        archive::thumbnail_url(DEFAULT_BASE_URL, identifier)
    }
}
