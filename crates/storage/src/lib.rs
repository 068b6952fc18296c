#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryStore, KeyValueStore, NullStore, PURCHASES_KEY, Storage, StorageError, StorageKind,
    VIDEO_PROGRESS_KEY,
};
