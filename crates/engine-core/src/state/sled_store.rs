use crate::{
    error::StateStoreError,
    queue::{OutputQueue, resolve_range},
    state::{CheckpointStore, decode},
};
use async_trait::async_trait;
use serde_json::{Map, Value as Json};
use std::path::Path;
use tracing::info;

/// Embedded backend: every checkpoint hash and every queue list is its own
/// sled tree. List entries are keyed by a big-endian sequence number, so tree
/// order is insertion order.
///
/// A sled database is owned by a single process; observing a running sync
/// from another process needs the Redis backend.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path.as_ref())?;
        info!("Opened sled state at {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// Helper to generate consistent tree names
    #[inline]
    fn hash_tree(key: &str) -> String {
        format!("hash:{key}")
    }

    #[inline]
    fn list_tree(key: &str) -> String {
        format!("list:{key}")
    }

    /// Opens a tree only if it already exists, so reads never create state.
    fn existing_tree(&self, name: &str) -> Result<Option<sled::Tree>, StateStoreError> {
        let exists = self
            .db
            .tree_names()
            .iter()
            .any(|tree| tree.as_ref() == name.as_bytes());
        if exists {
            Ok(Some(self.db.open_tree(name)?))
        } else {
            Ok(None)
        }
    }

    fn seq(bytes: &[u8], key: &str) -> Result<u64, StateStoreError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StateStoreError::CorruptedList(key.to_string()))?;
        Ok(u64::from_be_bytes(raw))
    }

    fn item(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[async_trait]
impl CheckpointStore for SledStore {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Json>, StateStoreError> {
        let Some(tree) = self.existing_tree(&Self::hash_tree(key))? else {
            return Ok(None);
        };
        Ok(tree.get(field)?.map(|raw| decode(&raw)))
    }

    async fn get_all(&self, key: &str) -> Result<Map<String, Json>, StateStoreError> {
        let mut all = Map::new();
        let Some(tree) = self.existing_tree(&Self::hash_tree(key))? else {
            return Ok(all);
        };
        for entry in tree.iter() {
            let (field, value) = entry?;
            all.insert(Self::item(&field), decode(&value));
        }
        Ok(all)
    }

    async fn set_field(&self, key: &str, field: &str, value: &Json) -> Result<(), StateStoreError> {
        let tree = self.db.open_tree(Self::hash_tree(key))?;
        tree.insert(field, serde_json::to_vec(value)?)?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn set_fields(&self, key: &str, values: &Map<String, Json>) -> Result<(), StateStoreError> {
        let tree = self.db.open_tree(Self::hash_tree(key))?;
        let mut batch = sled::Batch::default();
        for (field, value) in values {
            batch.insert(field.as_bytes(), serde_json::to_vec(value)?);
        }
        tree.apply_batch(batch)?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn has_field(&self, key: &str, field: &str) -> Result<bool, StateStoreError> {
        match self.existing_tree(&Self::hash_tree(key))? {
            Some(tree) => Ok(tree.contains_key(field)?),
            None => Ok(false),
        }
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<(), StateStoreError> {
        let Some(tree) = self.existing_tree(&Self::hash_tree(key))? else {
            return Ok(());
        };
        let mut batch = sled::Batch::default();
        for field in fields {
            batch.remove(field.as_bytes());
        }
        tree.apply_batch(batch)?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn delete_all(&self, key: &str) -> Result<(), StateStoreError> {
        self.db.drop_tree(Self::hash_tree(key))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StateStoreError> {
        Ok(self
            .existing_tree(&Self::hash_tree(key))?
            .is_some_and(|tree| !tree.is_empty()))
    }
}

#[async_trait]
impl OutputQueue for SledStore {
    async fn push(&self, key: &str, items: &[String]) -> Result<(), StateStoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let tree = self.db.open_tree(Self::list_tree(key))?;
        let mut next = match tree.last()? {
            Some((last, _)) => Self::seq(&last, key)? + 1,
            None => 0,
        };
        let mut batch = sled::Batch::default();
        for item in items {
            batch.insert(next.to_be_bytes().to_vec(), item.as_bytes());
            next += 1;
        }
        tree.apply_batch(batch)?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64, StateStoreError> {
        Ok(self
            .existing_tree(&Self::list_tree(key))?
            .map_or(0, |tree| tree.len() as u64))
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        let Some(tree) = self.existing_tree(&Self::list_tree(key))? else {
            return Ok(None);
        };
        Ok(tree.pop_min()?.map(|(_, item)| Self::item(&item)))
    }

    async fn pop_many(&self, key: &str, count: usize) -> Result<Vec<String>, StateStoreError> {
        let Some(tree) = self.existing_tree(&Self::list_tree(key))? else {
            return Ok(Vec::new());
        };
        let mut items = Vec::with_capacity(count.min(tree.len()));
        while items.len() < count {
            match tree.pop_min()? {
                Some((_, item)) => items.push(Self::item(&item)),
                None => break,
            }
        }
        Ok(items)
    }

    async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StateStoreError> {
        let Some(tree) = self.existing_tree(&Self::list_tree(key))? else {
            return Ok(Vec::new());
        };
        let (from, to) = resolve_range(tree.len() as u64, start, end);
        tree.iter()
            .skip(from as usize)
            .take((to - from) as usize)
            .map(|entry| -> Result<String, StateStoreError> { Ok(Self::item(&entry?.1)) })
            .collect()
    }

    async fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        self.db.drop_tree(Self::list_tree(key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn checkpoint_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            let mut values = Map::new();
            values.insert("total".into(), json!(5));
            values.insert("id".into(), json!("a1"));
            store.set_fields("task", &values).await.unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        assert!(store.exists("task").await.unwrap());
        assert_eq!(store.get("task", "total").await.unwrap(), Some(json!(5)));
        assert_eq!(store.get("task", "id").await.unwrap(), Some(json!("a1")));
        assert_eq!(store.get_all("task").await.unwrap().len(), 2);

        store.delete_all("task").await.unwrap();
        assert!(!store.exists("task").await.unwrap());
        assert_eq!(store.get("task", "total").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        store
            .push("q", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store.push("q", &["c".to_string()]).await.unwrap();

        assert_eq!(store.len("q").await.unwrap(), 3);
        assert_eq!(store.range("q", -2, -1).await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.pop("q").await.unwrap(), Some("a".to_string()));

        // sequence continues after a pop
        store.push("q", &["d".to_string()]).await.unwrap();
        assert_eq!(store.pop_many("q", 5).await.unwrap(), vec!["b", "c", "d"]);
        assert_eq!(store.len("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reads_do_not_create_trees() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.len("nothing").await.unwrap(), 0);
        assert!(!store.has_field("nothing", "count").await.unwrap());
        assert!(store.db.tree_names().iter().all(|t| t.as_ref() != b"list:nothing"));
    }
}
