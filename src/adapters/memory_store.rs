//! In-memory key-value store.
//!
//! Used by tests and by ephemeral runs that do not need durability. One
//! mutex guards the whole map, which makes `update` trivially atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{KeyValueStore, UpdateFn};

/// `HashMap`-backed [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no key is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> DomainResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> DomainResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> DomainResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn update(&self, key: &str, f: UpdateFn) -> DomainResult<()> {
        let mut entries = self.entries.lock().await;
        let current = entries.get(key).cloned();
        match f(current)? {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryKeyValueStore::new();
        store.put("site:a", b"1".to_vec()).await.unwrap();
        store.put("site:b", b"2".to_vec()).await.unwrap();
        store.put("manifest:a", b"3".to_vec()).await.unwrap();

        assert_eq!(store.get("site:a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.keys_with_prefix("site:").await.unwrap(), vec!["site:a", "site:b"]);

        store.delete("site:a").await.unwrap();
        store.delete("missing").await.unwrap();
        assert!(store.get("site:a").await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_transforms_and_deletes() {
        let store = MemoryKeyValueStore::new();
        store
            .update("k", Box::new(|cur| Ok(Some(cur.map_or(b"first".to_vec(), |_| b"again".to_vec())))))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"first".to_vec()));

        store.update("k", Box::new(|_| Ok(None))).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let store = MemoryKeyValueStore::new();
        store.put("k", b"keep".to_vec()).await.unwrap();
        let result = store
            .update("k", Box::new(|_| Err(DomainError::Storage("nope".into()))))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some(b"keep".to_vec()));
    }
}
