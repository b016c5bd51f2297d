//! Favorites Integration Tests
//!
//! Tests for uniqueness, ordering, encoding at rest and persistence.

use std::sync::Arc;

use async_trait::async_trait;
use iabrowse::library::{
    Favorite, FavoritesError, FavoritesStore, KeyValueStore, MemoryStore, StoreError, UpdateFn,
};
use tempfile::TempDir;
use tokio_test::assert_ok;

/// Store whose update is a plain get-then-set that yields in between, so
/// only the favorites write lock keeps concurrent mutations apart
#[derive(Default)]
struct YieldingStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for YieldingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self.inner.get(key).await;
        tokio::task::yield_now().await;
        value
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.set(key, value).await
    }

    async fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let current = self.get(key).await?;
        tokio::task::yield_now().await;
        if let Some(next) = change(current)? {
            self.set(key, &next).await?;
        }
        Ok(())
    }
}

fn favorite(id: &str) -> Favorite {
    Favorite::new(
        id,
        format!("Record {}", id),
        Some(format!("https://archive.org/services/img/{}", id)),
        format!("internetarchive:files:{}", id),
    )
}

async fn memory_store() -> FavoritesStore {
    FavoritesStore::open(Box::new(MemoryStore::new()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_duplicate_add_is_rejected() {
    let store = memory_store().await;

    assert_ok!(store.add(favorite("r1")).await);
    assert_eq!(store.len().await.unwrap(), 1);

    let result = store.add(favorite("r1")).await;
    assert!(matches!(result, Err(FavoritesError::AlreadyExists(ref id)) if id == "r1"));
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_uniqueness_is_by_identifier_only() {
    let store = memory_store().await;
    store.add(favorite("r1")).await.unwrap();

    // Same identifier, different title and link
    let renamed = Favorite::new("r1", "Other title", None, "elsewhere");
    assert!(store.add(renamed).await.is_err());

    // Identifiers compare case-sensitively
    store.add(favorite("R1")).await.unwrap();
    assert_eq!(store.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_add_then_remove() {
    let store = memory_store().await;
    store.add(favorite("r1")).await.unwrap();
    assert!(store.is_member("r1").await.unwrap());

    let removed = store.remove("r1").await.unwrap();
    assert_eq!(removed, favorite("r1"));
    assert!(!store.is_member("r1").await.unwrap());
    assert!(store.is_empty().await.unwrap());

    let result = store.remove("r1").await;
    assert!(matches!(result, Err(FavoritesError::NotFound(_))));
}

#[tokio::test]
async fn test_remove_keeps_order_of_others() {
    let store = memory_store().await;
    for id in ["r1", "r2", "r3"] {
        store.add(favorite(id)).await.unwrap();
    }

    store.remove("r2").await.unwrap();

    let ids: Vec<String> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.identifier)
        .collect();
    assert_eq!(ids, vec!["r3", "r1"]);
}

#[tokio::test]
async fn test_list_all_most_recent_first() {
    let store = memory_store().await;
    for id in ["r1", "r2", "r3"] {
        store.add(favorite(id)).await.unwrap();
    }

    let all = store.list_all().await.unwrap();
    assert_eq!(all, vec![favorite("r3"), favorite("r2"), favorite("r1")]);
}

#[tokio::test]
async fn test_list_most_recent_limit() {
    let store = memory_store().await;
    for id in ["r1", "r2", "r3", "r4", "r5"] {
        store.add(favorite(id)).await.unwrap();
    }

    let recent = store.list_most_recent(2).await.unwrap();
    assert_eq!(recent, vec![favorite("r5"), favorite("r4")]);

    // Limit above the length returns everything
    assert_eq!(store.list_most_recent(10).await.unwrap().len(), 5);
    assert!(store.list_most_recent(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unicode_fields_survive_encoding() {
    let store = memory_store().await;
    let titles = [
        "Nosferatu (1922)",
        "Ünïcödé & spaces / slashes?",
        "日本語のタイトル",
        "100% \"quoted\" #hash",
    ];

    for (i, title) in titles.iter().enumerate() {
        let id = format!("item{}", i);
        store
            .add(Favorite::new(
                id.clone(),
                *title,
                Some(format!("https://archive.org/services/img/{}?a=b&c=d", id)),
                format!("internetarchive:files:{}", id),
            ))
            .await
            .unwrap();
    }

    for (i, title) in titles.iter().enumerate() {
        let found = store
            .find_by_id(&format!("item{}", i))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, *title);
        assert_eq!(
            found.icon,
            Some(format!("https://archive.org/services/img/item{}?a=b&c=d", i))
        );
    }
}

#[tokio::test]
async fn test_clear() {
    let store = memory_store().await;
    store.add(favorite("r1")).await.unwrap();
    store.add(favorite("r2")).await.unwrap();

    store.clear().await.unwrap();
    assert!(store.is_empty().await.unwrap());
    assert!(store.list_all().await.unwrap().is_empty());

    // Clearing an empty list is fine
    assert_ok!(store.clear().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_serialized() {
    let store = Arc::new(
        FavoritesStore::open(Box::new(YieldingStore::default()))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.add(favorite(&format!("r{}", i))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.len().await.unwrap(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_handles_on_one_directory_keep_every_add() {
    let temp = TempDir::new().unwrap();
    let first = Arc::new(FavoritesStore::open_in(temp.path()).await.unwrap());
    let second = Arc::new(FavoritesStore::open_in(temp.path()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..25 {
        for (prefix, store) in [("a", first.clone()), ("b", second.clone())] {
            handles.push(tokio::spawn(async move {
                store.add(favorite(&format!("{}{}", prefix, i))).await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reopened = FavoritesStore::open_in(temp.path()).await.unwrap();
    assert_eq!(reopened.len().await.unwrap(), 50);
    assert!(reopened.is_member("a24").await.unwrap());
    assert!(reopened.is_member("b0").await.unwrap());

    // Duplicates are still caught across handles
    let result = second.add(favorite("a3")).await;
    assert!(matches!(result, Err(FavoritesError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_persists_across_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let store = FavoritesStore::open_in(temp.path()).await.unwrap();
        store.add(favorite("r1")).await.unwrap();
        store.add(favorite("r2")).await.unwrap();
    }

    let store = FavoritesStore::open_in(temp.path()).await.unwrap();
    assert_eq!(store.list_all().await.unwrap(), vec![favorite("r2"), favorite("r1")]);
    assert!(store.add(favorite("r1")).await.is_err());
}
