//! Key-value persistence port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Read-modify-write step for [`KeyValueStore::update`].
///
/// Receives the current value and returns the value to store; `None`
/// deletes the key.
pub type UpdateFn = Box<dyn FnOnce(Option<Vec<u8>>) -> DomainResult<Option<Vec<u8>>> + Send>;

/// Storage-agnostic byte store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> DomainResult<Option<Vec<u8>>>;

    /// Write a value, replacing any existing one.
    async fn put(&self, key: &str, value: Vec<u8>) -> DomainResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> DomainResult<()>;

    /// All keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> DomainResult<Vec<String>>;

    /// Atomically read, transform, and write one key.
    ///
    /// No other write to `key` may interleave between the read and the
    /// write. If `f` fails nothing is written.
    async fn update(&self, key: &str, f: UpdateFn) -> DomainResult<()>;
}
