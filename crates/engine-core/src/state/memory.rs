use crate::{
    error::StateStoreError,
    queue::{OutputQueue, resolve_range},
    state::CheckpointStore,
};
use async_trait::async_trait;
use serde_json::{Map, Value as Json};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Process-local checkpoint store and queue, used by tests and when the
/// engine is embedded without an external backend.
#[derive(Default)]
pub struct MemoryStore {
    hashes: Mutex<HashMap<String, Map<String, Json>>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Json>, StateStoreError> {
        let hashes = self.hashes.lock().await;
        Ok(hashes.get(key).and_then(|hash| hash.get(field)).cloned())
    }

    async fn get_all(&self, key: &str) -> Result<Map<String, Json>, StateStoreError> {
        let hashes = self.hashes.lock().await;
        Ok(hashes.get(key).cloned().unwrap_or_default())
    }

    async fn set_field(&self, key: &str, field: &str, value: &Json) -> Result<(), StateStoreError> {
        let mut hashes = self.hashes.lock().await;
        hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.clone());
        Ok(())
    }

    async fn set_fields(&self, key: &str, values: &Map<String, Json>) -> Result<(), StateStoreError> {
        let mut hashes = self.hashes.lock().await;
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in values {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn has_field(&self, key: &str, field: &str) -> Result<bool, StateStoreError> {
        let hashes = self.hashes.lock().await;
        Ok(hashes.get(key).is_some_and(|hash| hash.contains_key(field)))
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<(), StateStoreError> {
        let mut hashes = self.hashes.lock().await;
        if let Some(hash) = hashes.get_mut(key) {
            for field in fields {
                hash.remove(field);
            }
            if hash.is_empty() {
                hashes.remove(key);
            }
        }
        Ok(())
    }

    async fn delete_all(&self, key: &str) -> Result<(), StateStoreError> {
        self.hashes.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StateStoreError> {
        let hashes = self.hashes.lock().await;
        Ok(hashes.get(key).is_some_and(|hash| !hash.is_empty()))
    }
}

#[async_trait]
impl OutputQueue for MemoryStore {
    async fn push(&self, key: &str, items: &[String]) -> Result<(), StateStoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut lists = self.lists.lock().await;
        lists
            .entry(key.to_string())
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64, StateStoreError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        let mut lists = self.lists.lock().await;
        Ok(lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn pop_many(&self, key: &str, count: usize) -> Result<Vec<String>, StateStoreError> {
        let mut lists = self.lists.lock().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(Vec::new());
        };
        let take = count.min(list.len());
        Ok(list.drain(..take).collect())
    }

    async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StateStoreError> {
        let lists = self.lists.lock().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        let (from, to) = resolve_range(list.len() as u64, start, end);
        Ok(list
            .iter()
            .skip(from as usize)
            .take((to - from) as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        self.lists.lock().await.remove(key);
        Ok(())
    }
}
