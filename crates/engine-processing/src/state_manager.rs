use engine_core::{
    error::StateStoreError,
    progress::as_counter,
    state::{CheckpointStore, fields},
};
use model::pagination::cursor::{Cursor, CursorKind};
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use tracing::{debug, info};

/// Progress of one task as persisted in its checkpoint hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// `None` until the first run seeds it.
    pub total: Option<u64>,
    pub count: u64,
    pub page: u64,
    pub cursor: Cursor,
}

impl Checkpoint {
    pub fn is_fresh(&self) -> bool {
        self.total.is_none()
    }
}

/// Reads and writes the checkpoint hash of a single task.
///
/// The cursor is only ever written together with the page counters, after
/// the page was pushed, so the hash always names a position that is already
/// on the queue.
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    key: String,
    cursor_field: String,
    cursor_kind: CursorKind,
}

impl CheckpointManager {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        key: impl Into<String>,
        cursor_field: impl Into<String>,
        cursor_kind: CursorKind,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            cursor_field: cursor_field.into(),
            cursor_kind,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cursor_field(&self) -> &str {
        &self.cursor_field
    }

    pub async fn load(&self) -> Result<Checkpoint, StateStoreError> {
        let mut hash = self.store.get_all(&self.key).await?;
        let counter = |hash: &Map<String, Json>, field: &str| hash.get(field).and_then(as_counter);
        let total = counter(&hash, fields::TOTAL);
        let count = counter(&hash, fields::COUNT).unwrap_or(0);
        let page = counter(&hash, fields::PAGE).unwrap_or(0);
        let stored = hash.remove(&self.cursor_field);

        let checkpoint = Checkpoint {
            total,
            count,
            page,
            cursor: Cursor::from_checkpoint(self.cursor_kind, &self.cursor_field, stored),
        };
        debug!(key = %self.key, ?checkpoint, "checkpoint loaded");
        Ok(checkpoint)
    }

    pub async fn seed_total(&self, total: u64) -> Result<(), StateStoreError> {
        info!(key = %self.key, total, "total recorded");
        self.store
            .set_field(&self.key, fields::TOTAL, &Json::from(total))
            .await
    }

    /// Persists one finished page in a single write. `last` carries the new
    /// cursor and the last record pushed; an empty page passes `None` and
    /// keeps the previous cursor.
    pub async fn advance(
        &self,
        page: u64,
        count: u64,
        last: Option<(&Cursor, Json)>,
    ) -> Result<(), StateStoreError> {
        let mut values = Map::new();
        values.insert(fields::PAGE.into(), Json::from(page));
        values.insert(fields::COUNT.into(), Json::from(count));
        if let Some((cursor, record)) = last {
            values.insert(self.cursor_field.clone(), cursor.to_json());
            values.insert(fields::RECORD.into(), record);
        }
        self.store.set_fields(&self.key, &values).await
    }

    /// Removes the task's progress fields so the next run starts fresh.
    pub async fn finish(&self) -> Result<(), StateStoreError> {
        let names = [
            fields::COUNT,
            fields::PAGE,
            fields::TOTAL,
            fields::RECORD,
            self.cursor_field.as_str(),
        ]
        .map(str::to_string);
        self.store.delete_fields(&self.key, &names).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::state::memory::MemoryStore;
    use model::core::value::Value;
    use serde_json::json;

    fn manager(store: Arc<MemoryStore>) -> CheckpointManager {
        CheckpointManager::new(store, "conveyor.cache.t", "id", CursorKind::Key)
    }

    #[tokio::test]
    async fn empty_hash_is_fresh() {
        let checkpoint = manager(Arc::new(MemoryStore::new())).load().await.unwrap();
        assert!(checkpoint.is_fresh());
        assert_eq!(checkpoint.count, 0);
        assert_eq!(checkpoint.page, 0);
        assert_eq!(checkpoint.cursor, Cursor::None);
    }

    #[tokio::test]
    async fn advance_then_load() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        manager.seed_total(10).await.unwrap();
        manager
            .advance(1, 5, Some((&Cursor::key("id", Value::Int(42)), json!({"id": 42}))))
            .await
            .unwrap();

        let checkpoint = manager.load().await.unwrap();
        assert_eq!(checkpoint.total, Some(10));
        assert_eq!(checkpoint.count, 5);
        assert_eq!(checkpoint.page, 1);
        assert_eq!(checkpoint.cursor, Cursor::key("id", Value::Int(42)));
        assert_eq!(
            store.get("conveyor.cache.t", "record").await.unwrap(),
            Some(json!({"id": 42}))
        );
    }

    #[tokio::test]
    async fn empty_page_keeps_cursor() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store);
        manager
            .advance(1, 5, Some((&Cursor::key("id", Value::Int(7)), json!({"id": 7}))))
            .await
            .unwrap();
        manager.advance(2, 10, None).await.unwrap();

        let checkpoint = manager.load().await.unwrap();
        assert_eq!(checkpoint.page, 2);
        assert_eq!(checkpoint.count, 10);
        assert_eq!(checkpoint.cursor, Cursor::key("id", Value::Int(7)));
    }

    #[tokio::test]
    async fn finish_removes_progress_only() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_field("conveyor.cache.t", "owner", &json!("ops"))
            .await
            .unwrap();
        let manager = manager(store.clone());
        manager.seed_total(3).await.unwrap();
        manager
            .advance(1, 3, Some((&Cursor::key("id", Value::Int(3)), json!({"id": 3}))))
            .await
            .unwrap();
        manager.finish().await.unwrap();

        let left = store.get_all("conveyor.cache.t").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left["owner"], json!("ops"));
        assert!(manager.load().await.unwrap().is_fresh());
    }

    #[tokio::test]
    async fn counters_written_as_text_are_read() {
        let store = Arc::new(MemoryStore::new());
        let mut values = Map::new();
        values.insert("total".into(), json!("20"));
        values.insert("count".into(), json!("10"));
        values.insert("line".into(), json!(10));
        store.set_fields("conveyor.cache.f", &values).await.unwrap();

        let manager = CheckpointManager::new(store, "conveyor.cache.f", "line", CursorKind::Line);
        let checkpoint = manager.load().await.unwrap();
        assert_eq!(checkpoint.total, Some(20));
        assert_eq!(checkpoint.count, 10);
        assert_eq!(checkpoint.cursor, Cursor::Line { line: 10 });
    }
}
