//! Core browsing logic.
//!
//! This module contains:
//! - Page: The page model handed to the host
//! - Route: Route keys and parsing
//! - PageLoader: Incremental pagination over ranked searches
//! - Browser: Route handlers and page actions

pub mod browser;
pub mod loader;
pub mod page;
pub mod route;

// Re-export commonly used types
pub use browser::{Browser, BrowserSettings, RoutedPage, PLUGIN_TITLE};
pub use loader::{PageCursor, PageLoader, PaginationState, FETCH_FAILED_MESSAGE};
pub use page::{
    ActionKind, ItemKind, ItemMetadata, Layout, ListingSink, Notification, Notifier, Page,
    PageAction, PageItem, PageMetadata,
};
pub use route::{Route, UnknownRoute};
