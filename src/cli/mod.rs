//! Command-line interface for iabrowse.
//!
//! Plays the host role: opens routes, renders pages as text, runs
//! pagination on demand and dispatches page actions.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::adapters::ArchiveClient;
use crate::config;
use crate::core::{
    ActionKind, Browser, BrowserSettings, ItemKind, Layout, Notification, Notifier, PageItem,
    Route, RoutedPage,
};
use crate::library::FavoritesStore;

/// iabrowse - Internet Archive catalog browser
#[derive(Parser, Debug)]
#[command(name = "iabrowse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print pages as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the home page (favorites preview and most popular items)
    Home,

    /// List the most popular movies
    Popular,

    /// Search the archive
    Search {
        /// Archive query, e.g. "title:(nosferatu)"
        query: String,

        #[command(flatten)]
        paging: Paging,
    },

    /// List the playable files of an item
    Files {
        /// Archive identifier
        identifier: String,
    },

    /// Open any route key, e.g. internetarchive:popular
    Open {
        /// Route key
        route: String,

        #[command(flatten)]
        paging: Paging,
    },

    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommands {
    /// List all favorites, most recent first
    List,

    /// Add an item to favorites
    Add {
        /// Archive identifier
        identifier: String,
    },

    /// Remove an item from favorites
    Remove {
        /// Archive identifier
        identifier: String,
    },

    /// Remove all favorites
    Clear,
}

/// Pagination options for incremental listings
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct Paging {
    /// Number of result pages to load
    #[arg(short, long, default_value = "1")]
    pub pages: usize,

    /// Load pages until the results are exhausted
    #[arg(long, conflicts_with = "pages")]
    pub all: bool,
}

impl Paging {
    fn single() -> Self {
        Self {
            pages: 1,
            all: false,
        }
    }
}

/// Notifications go to stderr so listings stay pipeable
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("» {}", notification.message);
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let json = self.json;
        match self.command {
            Commands::Config => show_config(),
            Commands::Home => {
                let browser = build_browser().await?;
                show_route(&browser, Route::Start, Paging::single(), json).await
            }
            Commands::Popular => {
                let browser = build_browser().await?;
                show_route(&browser, Route::Popular, Paging::single(), json).await
            }
            Commands::Search { query, paging } => {
                let browser = build_browser().await?;
                show_route(&browser, Route::Search(query), paging, json).await
            }
            Commands::Files { identifier } => {
                let browser = build_browser().await?;
                show_route(&browser, Route::Files(identifier), Paging::single(), json).await
            }
            Commands::Open { route, paging } => {
                let browser = build_browser().await?;
                let route = Route::parse(&browser.settings().plugin_id, &route)?;
                show_route(&browser, route, paging, json).await
            }
            Commands::Favorites { command } => {
                let browser = build_browser().await?;
                execute_favorites(&browser, command).await
            }
        }
    }
}

/// Wire the browser from the resolved configuration
async fn build_browser() -> Result<Browser> {
    let cfg = config::config()?;

    let client = ArchiveClient::from_settings(&cfg.archive)
        .context("Failed to create archive.org client")?;
    let favorites = FavoritesStore::open_in(&cfg.store_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to open favorites store in {}",
                cfg.store_dir().display()
            )
        })?;

    Ok(Browser::new(
        Arc::new(client),
        Arc::new(favorites),
        Arc::new(TerminalNotifier),
        BrowserSettings::from(cfg),
    ))
}

/// Open a route, load the requested pages and print the result
async fn show_route(browser: &Browser, route: Route, paging: Paging, json: bool) -> Result<()> {
    let mut routed = browser.open_route(route).await;

    let mut loaded = 1;
    while routed.has_more() && (paging.all || loaded < paging.pages) {
        if !routed.load_more().await {
            break;
        }
        loaded += 1;
    }

    if json {
        print_json(&routed)?;
    } else {
        print_page(&routed);
    }

    if let Some(error) = routed.page.error() {
        anyhow::bail!("{}", error);
    }
    Ok(())
}

#[derive(Serialize)]
struct PageView<'a> {
    title: &'a str,
    layout: Layout,
    items: &'a [PageItem],
    error: Option<&'a str>,
    has_more: bool,
}

fn print_json(routed: &RoutedPage) -> Result<()> {
    let view = PageView {
        title: &routed.page.metadata.title,
        layout: routed.page.layout,
        items: routed.page.items(),
        error: routed.page.error(),
        has_more: routed.has_more(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn print_page(routed: &RoutedPage) {
    let page = &routed.page;

    println!("{}", page.metadata.title);
    println!("{}", "=".repeat(80));

    for item in page.items() {
        match item.kind {
            ItemKind::Separator => {
                if !item.metadata.title.is_empty() {
                    println!("\n-- {} --", item.metadata.title);
                }
            }
            ItemKind::Video | ItemKind::Audio => {
                let tag = if item.kind == ItemKind::Video { "video" } else { "audio" };
                println!("[{}] {}", tag, item.metadata.title);
                println!("        {}", item.url);
            }
            ItemKind::Directory | ItemKind::Search => {
                let title = truncate(&item.metadata.title, 47);
                println!("{:<50} {}", title, item.url);
            }
        }
    }

    if !page.actions().is_empty() {
        println!("\nActions:");
        for action in page.actions() {
            println!("  {:<26} {}", action.id, action.label);
        }
    }

    if let Some(loader) = routed.paginator.as_ref() {
        let emitted = loader.state().emitted;
        match loader.total_found() {
            Some(total) => println!("\nShowing {} of {} results", emitted, total),
            None => println!("\nShowing {} results", emitted),
        }
        if routed.has_more() {
            println!("More results available (use --pages or --all)");
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Execute favorites subcommands
async fn execute_favorites(browser: &Browser, command: FavoritesCommands) -> Result<()> {
    match command {
        FavoritesCommands::List => list_favorites(browser).await,
        FavoritesCommands::Add { identifier } => {
            let routed = browser.files_page(&identifier).await;
            if let Some(error) = routed.page.error() {
                anyhow::bail!("{}", error);
            }

            let action = routed
                .page
                .action("addItemToFavorites")
                .with_context(|| format!("'{}' has no playable files to save", identifier))?;
            browser.run_action(&action.kind).await?;
            Ok(())
        }
        FavoritesCommands::Remove { identifier } => {
            browser
                .run_action(&ActionKind::RemoveFavorite { identifier })
                .await?;
            Ok(())
        }
        FavoritesCommands::Clear => {
            if let Some(route) = browser.run_action(&ActionKind::ClearFavorites).await? {
                eprintln!("Next: iabrowse open {}", route);
            }
            Ok(())
        }
    }
}

/// List favorites as a table
async fn list_favorites(browser: &Browser) -> Result<()> {
    let favorites = browser.favorites().list_all().await?;

    if favorites.is_empty() {
        println!("No favorites yet. Use 'iabrowse favorites add <identifier>' to add one.");
        return Ok(());
    }

    println!("{:<32} {:<47}", "IDENTIFIER", "TITLE");
    println!("{}", "-".repeat(80));

    for favorite in &favorites {
        println!(
            "{:<32} {:<47}",
            truncate(&favorite.identifier, 29),
            truncate(&favorite.title, 44)
        );
    }

    println!("\nTotal: {} favorites", favorites.len());

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("iabrowse Configuration");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!("  Store:     {}", cfg.store_dir().display());
    println!();
    println!("Archive:");
    println!("  Base URL:   {}", cfg.archive.base_url);
    println!(
        "  Timeout:    {}",
        cfg.archive
            .timeout_seconds
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  User agent: {}", cfg.archive.user_agent);
    println!();
    println!("Browse:");
    println!("  Plugin id:        {}", cfg.plugin_id);
    println!("  Discover count:   {}", cfg.browse.discover_count);
    println!("  Search page size: {}", cfg.browse.search_page_size);
    println!("  Popular rows:     {}", cfg.browse.popular_rows);
    println!();
    println!("Favorites:");
    println!("  Disabled on home: {}", cfg.favorites.disabled);
    println!("  Preview limit:    {}", cfg.favorites.preview_limit);

    Ok(())
}
