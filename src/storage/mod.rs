//! Storage layer for supportrag
//!
//! Persists the (index, entries) pair so a restart can skip re-embedding.

mod index_store;

pub use index_store::{entries_path_for, IndexStore, PersistenceError, FORMAT_VERSION};
