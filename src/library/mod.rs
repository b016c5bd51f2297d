//! Local persistence: plugin-scoped key-value stores and the favorites list.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.iabrowse/
//! └── store/
//!     ├── favorites.json    # {"list": "<JSON array of favorites>"}
//!     └── favorites.lock    # advisory lock for writers
//! ```

pub mod favorites;
pub mod store;

pub use favorites::{Favorite, FavoritesError, FavoritesStore};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError, UpdateFn};
