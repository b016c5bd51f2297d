//! Incremental page loader.
//!
//! Presents a server-ranked, externally paginated result set as one sequence
//! fetched in fixed-size batches. The host re-invokes [`PageLoader::advance`]
//! until it returns false. A fetch failure ends pagination for good: earlier
//! items stay in the sink and the error is surfaced once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::page::{ListingSink, PageItem};
use super::route::Route;
use crate::adapters::{CatalogSource, SearchRequest};
use crate::domain::{CatalogRecord, MediaType};

/// Page error shown when a search request fails
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data from Internet Archive.";

/// Query used by the home page discovery section
pub const DISCOVER_QUERY: &str = "mediatype:(movies OR audio)";

/// Next page to fetch, or the terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// 1-based page number
    Page(u32),
    Exhausted,
}

/// Pagination state owned by a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub cursor: PageCursor,

    /// Items appended so far
    pub emitted: usize,

    /// Stop once this many items were appended
    pub target: Option<usize>,
}

impl PaginationState {
    pub fn new(target: Option<usize>) -> Self {
        Self {
            cursor: PageCursor::Page(1),
            emitted: 0,
            target,
        }
    }

    fn target_reached(&self) -> bool {
        self.target.is_some_and(|t| self.emitted >= t)
    }
}

/// Re-invokable step function over a ranked search
pub struct PageLoader {
    source: Arc<dyn CatalogSource>,
    request: SearchRequest,
    plugin_id: String,
    state: PaginationState,
    total_found: Option<u64>,
}

impl PageLoader {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        request: SearchRequest,
        target: Option<usize>,
        plugin_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            request,
            plugin_id: plugin_id.into(),
            state: PaginationState::new(target),
            total_found: None,
        }
    }

    /// Most popular movies and audio, `count` items in one batch
    pub fn discovery(source: Arc<dyn CatalogSource>, plugin_id: &str, count: u32) -> Self {
        let request = SearchRequest::new(DISCOVER_QUERY, MediaType::playable(), count);
        Self::new(source, request, Some(count as usize), plugin_id)
    }

    /// User search over movies and audio, unbounded
    pub fn search(
        source: Arc<dyn CatalogSource>,
        plugin_id: &str,
        query: &str,
        page_size: u32,
    ) -> Self {
        let request = SearchRequest::new(query, MediaType::playable(), page_size);
        Self::new(source, request, None, plugin_id)
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.cursor == PageCursor::Exhausted
    }

    /// `numFound` of the last successful fetch
    pub fn total_found(&self) -> Option<u64> {
        self.total_found
    }

    /// Fetch and append the next batch. Returns true when the host should
    /// call again.
    pub async fn advance(&mut self, sink: &mut dyn ListingSink) -> bool {
        let page = match self.state.cursor {
            PageCursor::Exhausted => return false,
            PageCursor::Page(page) => page,
        };

        let request = self.request.clone().with_page(page);
        let batch = match self.source.search(&request).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    page,
                    error = %e,
                    "Search fetch failed, abandoning pagination"
                );
                sink.set_error(FETCH_FAILED_MESSAGE);
                self.state.cursor = PageCursor::Exhausted;
                return false;
            }
        };
        self.total_found = Some(batch.total_found);

        for record in &batch.records {
            if self.state.target_reached() {
                break;
            }
            sink.append(record_item(self.source.as_ref(), &self.plugin_id, record));
            self.state.emitted += 1;
        }

        debug!(
            page,
            batch = batch.records.len(),
            emitted = self.state.emitted,
            "Loader appended batch"
        );

        if self.state.target_reached() || !batch.has_more {
            self.state.cursor = PageCursor::Exhausted;
            info!(emitted = self.state.emitted, "Loader exhausted");
            return false;
        }

        self.state.cursor = PageCursor::Page(page + 1);
        true
    }
}

/// Directory item for one catalog record
pub fn record_item(source: &dyn CatalogSource, plugin_id: &str, record: &CatalogRecord) -> PageItem {
    PageItem::directory(
        Route::Files(record.identifier.clone()).key(plugin_id),
        record.title.clone(),
    )
    .with_icon(source.thumbnail_url(&record.identifier))
    .with_description(format!("Type: {}", record.media_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FetchError;
    use crate::core::page::Page;
    use crate::domain::{ItemDetail, SearchPage};
    use async_trait::async_trait;

    /// Serves one fixed page and then nothing
    struct OnePage;

    #[async_trait]
    impl CatalogSource for OnePage {
        fn name(&self) -> &str {
            "one-page"
        }

        async fn search(&self, request: &SearchRequest) -> Result<SearchPage, FetchError> {
            if request.page > 1 {
                return Ok(SearchPage::default());
            }
            Ok(SearchPage {
                records: vec![CatalogRecord::new("a", "A", MediaType::Audio)],
                total_found: 1,
                has_more: true,
            })
        }

        async fn fetch_item_detail(&self, _identifier: &str) -> Result<ItemDetail, FetchError> {
            Err(FetchError::MissingField("metadata"))
        }
    }

    #[tokio::test]
    async fn test_record_item_shape() {
        let mut loader = PageLoader::search(Arc::new(OnePage), "internetarchive", "q", 50);
        let mut page = Page::new("t");

        assert!(loader.advance(&mut page).await);
        assert_eq!(loader.total_found(), Some(1));

        let item = &page.items()[0];
        assert_eq!(item.url, "internetarchive:files:a");
        assert_eq!(item.metadata.title, "A");
        assert_eq!(
            item.metadata.icon.as_deref(),
            Some("https://archive.org/services/img/a")
        );
        assert_eq!(item.metadata.description.as_deref(), Some("Type: audio"));

        // Second page is empty: exhausted without an error
        assert!(!loader.advance(&mut page).await);
        assert!(loader.is_exhausted());
        assert_eq!(page.error(), None);
        assert_eq!(loader.state().emitted, 1);
    }

    #[test]
    fn test_discovery_preset() {
        let loader = PageLoader::discovery(Arc::new(OnePage), "internetarchive", 9);
        assert_eq!(loader.request.query, DISCOVER_QUERY);
        assert_eq!(loader.request.rows, 9);
        assert_eq!(loader.state().target, Some(9));
        assert_eq!(loader.state().cursor, PageCursor::Page(1));
    }
}
