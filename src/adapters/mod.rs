//! Adapters implementing the domain ports.

pub mod broadcast;
pub mod classifiers;
pub mod memory_store;
pub mod sqlite;

pub use broadcast::BroadcastNotifier;
pub use memory_store::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
