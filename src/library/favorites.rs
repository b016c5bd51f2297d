//! Favorites list persisted in a plugin-scoped key-value store.
//!
//! The whole list lives under one key as a JSON array in insertion order.
//! Title, icon and link are percent-encoded at rest. Every mutation is a
//! whole-list read-modify-write done as one atomic store update, serialized
//! within a handle by the write lock and across handles by the store itself.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::store::{JsonFileStore, KeyValueStore, StoreError};

/// Name of the plugin-scoped store holding favorites
pub const FAVORITES_STORE: &str = "favorites";

/// Key of the serialized list inside the store
pub const LIST_KEY: &str = "list";

/// Errors from the favorites store
#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Favorite already exists: {0}")]
    AlreadyExists(String),

    #[error("Favorite not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid percent-encoding in stored {field}: {value}")]
    Encoding { field: &'static str, value: String },
}

/// A user-pinned catalog item (decoded form)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    /// Archive identifier (unique key)
    pub identifier: String,

    pub title: String,

    /// Thumbnail URL
    pub icon: Option<String>,

    /// Route key of the item's file listing
    pub link: String,
}

/// On-disk form: every text field except the identifier is percent-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFavorite {
    identifier: String,
    title: String,
    icon: Option<String>,
    link: String,
}

impl Favorite {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        icon: Option<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            icon,
            link: link.into(),
        }
    }

    fn encode(&self) -> StoredFavorite {
        StoredFavorite {
            identifier: self.identifier.clone(),
            title: urlencoding::encode(&self.title).into_owned(),
            icon: self
                .icon
                .as_deref()
                .map(|icon| urlencoding::encode(icon).into_owned()),
            link: urlencoding::encode(&self.link).into_owned(),
        }
    }

    fn decode(stored: &StoredFavorite) -> Result<Self, FavoritesError> {
        Ok(Self {
            identifier: stored.identifier.clone(),
            title: decode_field("title", &stored.title)?,
            icon: stored
                .icon
                .as_deref()
                .map(|icon| decode_field("icon", icon))
                .transpose()?,
            link: decode_field("link", &stored.link)?,
        })
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<String, FavoritesError> {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .map_err(|_| FavoritesError::Encoding {
            field,
            value: value.to_string(),
        })
}

/// Ordered, identifier-unique favorites list
pub struct FavoritesStore {
    store: Box<dyn KeyValueStore>,
    /// Single-owner path for read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FavoritesStore {
    /// Open the list in `store`, initializing it to `[]` when absent
    pub async fn open(store: Box<dyn KeyValueStore>) -> Result<Self, FavoritesError> {
        store
            .update(LIST_KEY, &mut |current: Option<String>| {
                Ok(current.is_none().then(|| "[]".to_string()))
            })
            .await?;

        Ok(Self {
            store,
            write_lock: Mutex::new(()),
        })
    }

    /// Open the file-backed favorites store inside `store_dir`
    pub async fn open_in(store_dir: &Path) -> Result<Self, FavoritesError> {
        let store = JsonFileStore::open(store_dir, FAVORITES_STORE);
        Self::open(Box::new(store)).await
    }

    async fn load(&self) -> Result<Vec<StoredFavorite>, FavoritesError> {
        match self.store.get(LIST_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Apply `change` to the stored list in one atomic store update. The list
    /// is written back only when `change` succeeds.
    async fn modify<T, F>(&self, mut change: F) -> Result<T, FavoritesError>
    where
        F: FnMut(&mut Vec<StoredFavorite>) -> Result<T, FavoritesError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut outcome: Option<Result<T, FavoritesError>> = None;
        self.store
            .update(LIST_KEY, &mut |current: Option<String>| {
                let mut list: Vec<StoredFavorite> = match current {
                    Some(raw) => serde_json::from_str(&raw)?,
                    None => Vec::new(),
                };

                match change(&mut list) {
                    Ok(value) => {
                        outcome = Some(Ok(value));
                        Ok(Some(serde_json::to_string(&list)?))
                    }
                    Err(e) => {
                        outcome = Some(Err(e));
                        Ok(None)
                    }
                }
            })
            .await?;

        outcome.unwrap_or_else(|| {
            Err(FavoritesError::Storage(StoreError::UpdateNotApplied(
                LIST_KEY.to_string(),
            )))
        })
    }

    /// Append a favorite. Fails with `AlreadyExists` if the identifier is
    /// already present, leaving the list untouched.
    pub async fn add(&self, favorite: Favorite) -> Result<(), FavoritesError> {
        let stored = favorite.encode();
        let count = self
            .modify(|list| {
                if list.iter().any(|f| f.identifier == stored.identifier) {
                    return Err(FavoritesError::AlreadyExists(stored.identifier.clone()));
                }
                list.push(stored.clone());
                Ok(list.len())
            })
            .await
            .inspect_err(|e| {
                if matches!(e, FavoritesError::AlreadyExists(_)) {
                    debug!(identifier = %favorite.identifier, "Favorite already present");
                }
            })?;

        info!(identifier = %favorite.identifier, count, "Favorite added");
        Ok(())
    }

    /// Remove a favorite and return it. Fails with `NotFound` if absent.
    pub async fn remove(&self, identifier: &str) -> Result<Favorite, FavoritesError> {
        let (removed, count) = self
            .modify(|list| {
                let removed = list
                    .iter()
                    .find(|f| f.identifier == identifier)
                    .ok_or_else(|| FavoritesError::NotFound(identifier.to_string()))
                    .and_then(Favorite::decode)?;
                list.retain(|f| f.identifier != identifier);
                Ok((removed, list.len()))
            })
            .await?;

        info!(identifier, count, "Favorite removed");
        Ok(removed)
    }

    /// Replace the list with an empty one
    pub async fn clear(&self) -> Result<(), FavoritesError> {
        let _guard = self.write_lock.lock().await;
        self.store.set(LIST_KEY, "[]").await?;

        info!("Favorites cleared");
        Ok(())
    }

    pub async fn is_member(&self, identifier: &str) -> Result<bool, FavoritesError> {
        let list = self.load().await?;
        Ok(list.iter().any(|f| f.identifier == identifier))
    }

    pub async fn find_by_id(&self, identifier: &str) -> Result<Option<Favorite>, FavoritesError> {
        let list = self.load().await?;
        list.iter()
            .find(|f| f.identifier == identifier)
            .map(Favorite::decode)
            .transpose()
    }

    /// Up to `limit` favorites, most recently added first
    pub async fn list_most_recent(&self, limit: usize) -> Result<Vec<Favorite>, FavoritesError> {
        let list = self.load().await?;
        list.iter().rev().take(limit).map(Favorite::decode).collect()
    }

    /// All favorites, most recently added first
    pub async fn list_all(&self) -> Result<Vec<Favorite>, FavoritesError> {
        let list = self.load().await?;
        list.iter().rev().map(Favorite::decode).collect()
    }

    /// Number of stored favorites
    pub async fn len(&self) -> Result<usize, FavoritesError> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, FavoritesError> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::store::MemoryStore;
    use std::sync::Arc;

    fn favorite(id: &str) -> Favorite {
        Favorite::new(
            id,
            format!("Title {}", id),
            Some(format!("https://archive.org/services/img/{}", id)),
            format!("internetarchive:files:{}", id),
        )
    }

    #[tokio::test]
    async fn test_open_initializes_empty_list() {
        let backing = Arc::new(MemoryStore::new());
        let store = FavoritesStore::open(Box::new(backing.clone())).await.unwrap();

        assert!(store.is_empty().await.unwrap());
        assert_eq!(backing.get(LIST_KEY).await.unwrap(), Some("[]".to_string()));
    }

    #[tokio::test]
    async fn test_open_keeps_existing_list() {
        let backing = Arc::new(MemoryStore::new());
        {
            let store = FavoritesStore::open(Box::new(backing.clone())).await.unwrap();
            store.add(favorite("a")).await.unwrap();
        }

        let store = FavoritesStore::open(Box::new(backing)).await.unwrap();
        assert!(store.is_member("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_fields_encoded_at_rest() {
        let backing = Arc::new(MemoryStore::new());
        let store = FavoritesStore::open(Box::new(backing.clone())).await.unwrap();

        store
            .add(Favorite::new("x", "A & B", None, "internetarchive:files:x"))
            .await
            .unwrap();

        let raw = backing.get(LIST_KEY).await.unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored[0]["identifier"], "x");
        assert_eq!(stored[0]["title"], "A%20%26%20B");
        assert_eq!(stored[0]["icon"], serde_json::Value::Null);
        assert_eq!(stored[0]["link"], "internetarchive%3Afiles%3Ax");
    }

    #[tokio::test]
    async fn test_corrupt_encoding_is_reported() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .set(
                LIST_KEY,
                r#"[{"identifier":"x","title":"%FF%FE","icon":null,"link":"l"}]"#,
            )
            .await
            .unwrap();
        let store = FavoritesStore::open(Box::new(backing)).await.unwrap();

        // Membership only looks at identifiers
        assert!(store.is_member("x").await.unwrap());
        let result = store.list_all().await;
        assert!(matches!(
            result,
            Err(FavoritesError::Encoding { field: "title", .. })
        ));
    }

    #[tokio::test]
    async fn test_file_backed_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = FavoritesStore::open_in(temp.path()).await.unwrap();
        store.add(favorite("a")).await.unwrap();
        drop(store);

        let store = FavoritesStore::open_in(temp.path()).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![favorite("a")]);
        assert!(temp.path().join("favorites.json").exists());
    }
}
