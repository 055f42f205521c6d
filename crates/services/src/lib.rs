//! Storage services: key-value backends and the favorites persistence adapter.

pub mod favorites_store;
pub mod storage;

pub use favorites_store::{export_to, import_from, FavoritesStore, FAVORITES_KEY};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
