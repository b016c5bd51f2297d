//! Page model handed to the host for rendering.
//!
//! A page is an ordered, append-only list of items plus metadata, registered
//! actions and an error flag. The host decides how to draw it.

use std::time::Duration;

use serde::Serialize;

use crate::domain::MediaKind;
use crate::library::Favorite;

/// Kind tag of a rendered item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Directory,
    Video,
    Audio,
    Search,
    Separator,
}

impl From<MediaKind> for ItemKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => ItemKind::Video,
            MediaKind::Audio => ItemKind::Audio,
        }
    }
}

/// How the host should lay out the items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    List,
    Grid,
}

/// Metadata bag of one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Playable source URLs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// One renderable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageItem {
    /// Route key or media URL; empty for separators
    pub url: String,
    pub kind: ItemKind,
    pub metadata: ItemMetadata,
}

impl PageItem {
    pub fn new(url: impl Into<String>, kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            metadata: ItemMetadata {
                title: title.into(),
                ..Default::default()
            },
        }
    }

    pub fn directory(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(url, ItemKind::Directory, title)
    }

    pub fn separator(title: impl Into<String>) -> Self {
        Self::new("", ItemKind::Separator, title)
    }

    pub fn search(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(url, ItemKind::Search, title)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.metadata.icon = Some(icon.into());
        self
    }

    pub fn with_optional_icon(mut self, icon: Option<String>) -> Self {
        self.metadata.icon = icon;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.metadata.sources.push(url.into());
        self
    }
}

/// Page-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub icon: Option<String>,
    pub background: Option<String>,
}

/// What a page action does when the host triggers it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    AddFavorite(Favorite),
    RemoveFavorite { identifier: String },
    ClearFavorites,
}

/// A named, labelled action registered on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAction {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: ActionKind,
}

/// A fire-and-forget user notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub duration: Duration,
}

/// Host side of transient notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Append-only destination for listing items
pub trait ListingSink {
    fn append(&mut self, item: PageItem);

    /// Flag a page-level error visible to the host
    fn set_error(&mut self, message: &str);
}

/// A constructed page
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub metadata: PageMetadata,
    pub layout: Layout,
    items: Vec<PageItem>,
    actions: Vec<PageAction>,
    error: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            metadata: PageMetadata {
                title: title.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn items(&self) -> &[PageItem] {
        &self.items
    }

    pub fn actions(&self) -> &[PageAction] {
        &self.actions
    }

    pub fn action(&self, id: &str) -> Option<&PageAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn add_action(&mut self, id: &'static str, label: &'static str, kind: ActionKind) {
        self.actions.push(PageAction { id, label, kind });
    }

    /// Items that are not separators
    pub fn entries(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind != ItemKind::Separator)
            .count()
    }
}

impl ListingSink for Page {
    fn append(&mut self, item: PageItem) {
        self.items.push(item);
    }

    fn set_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}
