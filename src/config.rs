//! Configuration for iabrowse.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (IABROWSE_HOME, IABROWSE_BASE_URL, IABROWSE_DISABLE_FAVORITES)
//! 2. Config file (.iabrowse/config.yaml)
//! 3. Defaults (~/.iabrowse, https://archive.org)
//!
//! Config file discovery:
//! - Searches current directory and parents for .iabrowse/config.yaml
//! - `paths.home` in the config file is relative to the .iabrowse/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DEFAULT_BASE_URL;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default plugin id, used as the route prefix
pub const DEFAULT_PLUGIN_ID: &str = "internetarchive";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
    #[serde(default)]
    pub browse: Option<BrowseConfig>,
    #[serde(default)]
    pub favorites: Option<FavoritesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .iabrowse/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowseConfig {
    pub discover_count: Option<u32>,
    pub search_page_size: Option<u32>,
    pub popular_rows: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoritesConfig {
    pub disabled: Option<bool>,
    pub preview_limit: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the state directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Route prefix
    pub plugin_id: String,
    pub archive: ArchiveSettings,
    pub browse: BrowseSettings,
    pub favorites: FavoritesSettings,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub base_url: String,
    /// No timeout unless configured
    pub timeout_seconds: Option<u64>,
    pub user_agent: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            user_agent: format!("iabrowse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowseSettings {
    /// Items shown in the home page discovery section
    pub discover_count: u32,
    /// Rows per search page
    pub search_page_size: u32,
    /// Rows fetched for the popular listing
    pub popular_rows: u32,
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            discover_count: 9,
            search_page_size: 50,
            popular_rows: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FavoritesSettings {
    /// Hide the favorites section on the home page
    pub disabled: bool,
    /// Favorites previewed on the home page
    pub preview_limit: usize,
}

impl Default for FavoritesSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            preview_limit: 4,
        }
    }
}

impl ResolvedConfig {
    /// Defaults rooted at `home`, ignoring files and environment
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            config_file: None,
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            archive: ArchiveSettings::default(),
            browse: BrowseSettings::default(),
            favorites: FavoritesSettings::default(),
        }
    }

    /// Directory holding plugin-scoped key-value stores
    pub fn store_dir(&self) -> PathBuf {
        self.home.join("store")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".iabrowse").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Parse a boolean environment flag ("1", "true", "yes")
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Merge a parsed config file over the defaults
fn apply_config_file(resolved: &mut ResolvedConfig, config: ConfigFile, config_path: &Path) {
    if let Some(id) = config.plugin_id.filter(|s| !s.trim().is_empty()) {
        resolved.plugin_id = id;
    }

    if let Some(ref home_path) = config.paths.home {
        let iabrowse_dir = config_path.parent().unwrap_or(Path::new("."));
        resolved.home = resolve_path(iabrowse_dir, home_path);
    }

    if let Some(archive) = config.archive {
        if let Some(base_url) = archive.base_url {
            resolved.archive.base_url = base_url;
        }
        resolved.archive.timeout_seconds = archive.timeout_seconds;
        if let Some(user_agent) = archive.user_agent {
            resolved.archive.user_agent = user_agent;
        }
    }

    if let Some(browse) = config.browse {
        let defaults = BrowseSettings::default();
        resolved.browse = BrowseSettings {
            discover_count: browse
                .discover_count
                .filter(|n| *n > 0)
                .unwrap_or(defaults.discover_count),
            search_page_size: browse
                .search_page_size
                .filter(|n| *n > 0)
                .unwrap_or(defaults.search_page_size),
            popular_rows: browse
                .popular_rows
                .filter(|n| *n > 0)
                .unwrap_or(defaults.popular_rows),
        };
    }

    if let Some(favorites) = config.favorites {
        let defaults = FavoritesSettings::default();
        resolved.favorites = FavoritesSettings {
            disabled: favorites.disabled.unwrap_or(defaults.disabled),
            preview_limit: favorites.preview_limit.unwrap_or(defaults.preview_limit),
        };
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".iabrowse");

    let mut resolved = ResolvedConfig::with_home(default_home);

    let config_file = find_config_file();
    if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        apply_config_file(&mut resolved, config, config_path);
    }
    resolved.config_file = config_file;

    // Environment wins over the file
    if let Ok(env_home) = std::env::var("IABROWSE_HOME") {
        resolved.home = PathBuf::from(env_home);
    }
    if let Ok(base_url) = std::env::var("IABROWSE_BASE_URL") {
        resolved.archive.base_url = base_url;
    }
    if let Some(disabled) = env_flag("IABROWSE_DISABLE_FAVORITES") {
        resolved.favorites.disabled = disabled;
    }

    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
