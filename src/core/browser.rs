//! Route handlers: builds each page from the catalog source and favorites.
//!
//! One `Browser` owns the collaborators every route needs and is passed by
//! reference to the host; there is no global state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use super::loader::{record_item, PageLoader, FETCH_FAILED_MESSAGE};
use super::page::{ActionKind, Layout, ListingSink, Notification, Notifier, Page, PageItem};
use super::route::{Route, UnknownRoute};
use crate::adapters::{CatalogSource, SearchRequest};
use crate::config::{BrowseSettings, FavoritesSettings, ResolvedConfig, DEFAULT_PLUGIN_ID};
use crate::domain::MediaType;
use crate::library::{Favorite, FavoritesError, FavoritesStore};

/// Display name of the plugin
pub const PLUGIN_TITLE: &str = "Internet Archive";

pub const REFRESH_ICON: &str = "https://i.postimg.cc/T1j3TpwG/refresh.png";
pub const FAVORITES_ICON: &str = "https://i.postimg.cc/zGT28Cz2/favs.png";
pub const SEE_MORE_ICON: &str = "https://i.postimg.cc/cJLV4kMN/seemore.png";

/// Query of the popular listing
pub const POPULAR_QUERY: &str = "mediatype:movies";

const METADATA_FAILED_MESSAGE: &str = "Failed to fetch item metadata.";
const FAVORITES_FAILED_MESSAGE: &str = "Failed to read My Favorites.";

/// Settings the route handlers read
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub plugin_id: String,
    pub browse: BrowseSettings,
    pub favorites: FavoritesSettings,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            browse: BrowseSettings::default(),
            favorites: FavoritesSettings::default(),
        }
    }
}

impl From<&ResolvedConfig> for BrowserSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            plugin_id: config.plugin_id.clone(),
            browse: config.browse.clone(),
            favorites: config.favorites.clone(),
        }
    }
}

/// A constructed page with its optional pagination continuation
pub struct RoutedPage {
    pub page: Page,
    pub paginator: Option<PageLoader>,
}

impl RoutedPage {
    fn done(page: Page) -> Self {
        Self {
            page,
            paginator: None,
        }
    }

    /// Run one pagination step. False once there is nothing more to load.
    pub async fn load_more(&mut self) -> bool {
        match self.paginator.as_mut() {
            Some(loader) => loader.advance(&mut self.page).await,
            None => false,
        }
    }

    pub fn has_more(&self) -> bool {
        self.paginator.as_ref().is_some_and(|l| !l.is_exhausted())
    }
}

/// Entry point for every route
pub struct Browser {
    source: Arc<dyn CatalogSource>,
    favorites: Arc<FavoritesStore>,
    notifier: Arc<dyn Notifier>,
    settings: BrowserSettings,
}

impl Browser {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        favorites: Arc<FavoritesStore>,
        notifier: Arc<dyn Notifier>,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            source,
            favorites,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    /// Route key for a route under this plugin
    pub fn key(&self, route: &Route) -> String {
        route.key(&self.settings.plugin_id)
    }

    /// Route registered with the host's top-level navigation
    pub fn start_route(&self) -> String {
        self.key(&Route::Start)
    }

    fn notify(&self, message: impl Into<String>, seconds: u64) {
        self.notifier.notify(Notification {
            message: message.into(),
            duration: Duration::from_secs(seconds),
        });
    }

    /// Open a page by route key
    pub async fn open(&self, key: &str) -> Result<RoutedPage, UnknownRoute> {
        let route = Route::parse(&self.settings.plugin_id, key)?;
        Ok(self.open_route(route).await)
    }

    pub async fn open_route(&self, route: Route) -> RoutedPage {
        match route {
            Route::Start => self.home_page().await,
            Route::Popular => self.popular_page().await,
            Route::Files(identifier) => self.files_page(&identifier).await,
            Route::Search(query) => self.search_page(&query).await,
            Route::Favorites => self.favorites_page().await,
        }
    }

    /// Home: favorites preview, discovery batch, search entry
    #[instrument(skip(self))]
    pub async fn home_page(&self) -> RoutedPage {
        let mut page = Page::new(PLUGIN_TITLE);
        page.layout = Layout::Grid;

        if !self.settings.favorites.disabled {
            if let Err(e) = self.append_favorites_preview(&mut page).await {
                error!(error = %e, "Failed to read favorites");
                page.set_error(FAVORITES_FAILED_MESSAGE);
                return RoutedPage::done(page);
            }
        }

        page.append(PageItem::separator("Discover: Most Popular Archives"));
        page.append(PageItem::separator(""));
        page.append(PageItem::search(
            self.key(&Route::Search(String::new())),
            "Search Archive.org",
        ));
        page.append(PageItem::separator(""));

        let mut loader = PageLoader::discovery(
            self.source.clone(),
            &self.settings.plugin_id,
            self.settings.browse.discover_count,
        );
        loader.advance(&mut page).await;
        if page.error().is_some() {
            return RoutedPage::done(page);
        }

        page.append(
            PageItem::directory(self.key(&Route::Popular), "Show All...").with_icon(SEE_MORE_ICON),
        );

        self.notify("Visit Archive.org and Donate if you can!", 7);
        RoutedPage {
            page,
            paginator: Some(loader),
        }
    }

    async fn append_favorites_preview(&self, page: &mut Page) -> Result<(), FavoritesError> {
        let limit = self.settings.favorites.preview_limit;
        // Preview and links come from one read
        let all = self.favorites.list_all().await?;
        let total = all.len();

        page.append(PageItem::separator("My Favorites"));
        page.append(PageItem::separator(""));

        for favorite in all.into_iter().take(limit) {
            page.append(favorite_item(favorite));
        }

        if total < limit {
            page.append(
                PageItem::directory(self.start_route(), "Refresh").with_icon(REFRESH_ICON),
            );
        }
        if total > 0 {
            page.append(
                PageItem::directory(self.key(&Route::Favorites), "Show All...")
                    .with_icon(FAVORITES_ICON),
            );
        }

        Ok(())
    }

    /// All popular movies in one batch
    #[instrument(skip(self))]
    pub async fn popular_page(&self) -> RoutedPage {
        let mut page = Page::new("All Popular Items");
        page.layout = Layout::Grid;

        let movies = [MediaType::Movies].into_iter().collect();
        let request = SearchRequest::new(POPULAR_QUERY, movies, self.settings.browse.popular_rows);

        match self.source.search(&request).await {
            Ok(batch) => {
                for record in &batch.records {
                    page.append(record_item(
                        self.source.as_ref(),
                        &self.settings.plugin_id,
                        record,
                    ));
                }
            }
            Err(e) => {
                warn!(error = %e, "Popular listing fetch failed");
                page.set_error(FETCH_FAILED_MESSAGE);
            }
        }

        RoutedPage::done(page)
    }

    /// Playable files of one item
    #[instrument(skip(self))]
    pub async fn files_page(&self, identifier: &str) -> RoutedPage {
        // Encoded for the listing image only; favorites keep the raw thumbnail
        let listing_image = self.source.thumbnail_url(&urlencoding::encode(identifier));
        let mut page = Page::new(identifier);
        page.metadata.background = Some(listing_image.clone());

        let detail = match self.source.fetch_item_detail(identifier).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(error = %e, "Item metadata fetch failed");
                page.set_error(METADATA_FAILED_MESSAGE);
                return RoutedPage::done(page);
            }
        };

        if let Some(reason) = detail.empty_reason() {
            info!(total_files = detail.total_files, "No playable files");
            page.append(PageItem::separator(reason.message()));
            return RoutedPage::done(page);
        }

        let favorite = Favorite::new(
            identifier,
            detail.title.clone(),
            Some(self.source.thumbnail_url(identifier)),
            self.key(&Route::Files(identifier.to_string())),
        );
        page.add_action(
            "addItemToFavorites",
            "Save this Item to My Favorites",
            ActionKind::AddFavorite(favorite),
        );
        page.add_action(
            "removeItemFromFavorites",
            "Remove this Item from My Favorites",
            ActionKind::RemoveFavorite {
                identifier: identifier.to_string(),
            },
        );

        for file in &detail.files {
            page.append(
                PageItem::new(file.url.clone(), file.kind.into(), file.name.clone())
                    .with_source(file.url.clone())
                    .with_icon(listing_image.clone()),
            );
        }

        self.notify("Some Files (May) Be Restricted.", 5);
        RoutedPage::done(page)
    }

    /// Search results page
    #[instrument(skip(self))]
    pub async fn search_page(&self, query: &str) -> RoutedPage {
        let page = Page::new(format!("Search results for: {}", query));
        self.run_search(page, query).await
    }

    /// Host-level global search hook
    pub async fn global_search(&self, query: &str) -> RoutedPage {
        self.run_search(Page::new(PLUGIN_TITLE), query).await
    }

    async fn run_search(&self, mut page: Page, query: &str) -> RoutedPage {
        page.layout = Layout::Grid;

        let mut loader = PageLoader::search(
            self.source.clone(),
            &self.settings.plugin_id,
            query,
            self.settings.browse.search_page_size,
        );
        loader.advance(&mut page).await;

        if page.error().is_some() {
            return RoutedPage::done(page);
        }
        RoutedPage {
            page,
            paginator: Some(loader),
        }
    }

    /// All favorites, most recent first
    #[instrument(skip(self))]
    pub async fn favorites_page(&self) -> RoutedPage {
        let mut page = Page::new("My Favorites");
        page.layout = Layout::Grid;
        page.metadata.icon = Some(FAVORITES_ICON.to_string());

        page.add_action(
            "cleanFavorites",
            "Empty My Favorites",
            ActionKind::ClearFavorites,
        );
        page.append(
            PageItem::directory(self.key(&Route::Favorites), "Refresh").with_icon(REFRESH_ICON),
        );

        match self.favorites.list_all().await {
            Ok(all) => {
                for favorite in all {
                    page.append(favorite_item(favorite));
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to read favorites");
                page.set_error(FAVORITES_FAILED_MESSAGE);
                return RoutedPage::done(page);
            }
        }

        self.notify("Empty My Favorites in the Side-Menu", 7);
        RoutedPage::done(page)
    }

    /// Run a page action. Duplicate adds and missing removes are reported
    /// through notifications; storage failures are returned. Returns the
    /// route the host should redirect to, if any.
    pub async fn run_action(&self, action: &ActionKind) -> Result<Option<String>, FavoritesError> {
        match action {
            ActionKind::AddFavorite(favorite) => {
                match self.favorites.add(favorite.clone()).await {
                    Ok(()) => {
                        self.notify(
                            format!("'{}' has been added to My Favorites.", favorite.title),
                            3,
                        );
                    }
                    Err(FavoritesError::AlreadyExists(_)) => {
                        self.notify(
                            format!("'{}' is already in My Favorites.", favorite.title),
                            3,
                        );
                    }
                    Err(e) => return Err(e),
                }
                Ok(None)
            }
            ActionKind::RemoveFavorite { identifier } => {
                match self.favorites.remove(identifier).await {
                    Ok(removed) => {
                        self.notify(
                            format!("'{}' has been removed from My Favorites.", removed.title),
                            3,
                        );
                    }
                    Err(FavoritesError::NotFound(_)) => {
                        self.notify("Item not found in My Favorites.", 3);
                    }
                    Err(e) => return Err(e),
                }
                Ok(None)
            }
            ActionKind::ClearFavorites => {
                self.favorites.clear().await?;
                self.notify("Favorites has been emptied successfully", 3);
                Ok(Some(self.start_route()))
            }
        }
    }
}

/// Directory item for a stored favorite
fn favorite_item(favorite: Favorite) -> PageItem {
    let description = format!("Link: {}", favorite.link);
    PageItem::directory(favorite.link, favorite.title)
        .with_optional_icon(favorite.icon)
        .with_description(description)
}
