use async_trait::async_trait;
use connectors::{
    document::{
        client::{DocumentClient, PageRequest},
        error::DocumentError,
    },
    source::DataSource,
    sql::base::{
        client::SqlClient,
        dialect::{Dialect, MySql},
        error::DbError,
        offsets::BoundQuery,
    },
};
use engine_config::settings::task::TaskConfig;
use engine_core::{
    error::StateStoreError,
    keys::TaskKeys,
    queue::OutputQueue,
    state::{CheckpointStore, memory::MemoryStore},
};
use engine_processing::{
    engine::{MigrationEngine, SyncOptions},
    transform::PageTransformer,
};
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use serde_json::{Map, Value as Json, json};
use std::{
    io::Write,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::NamedTempFile;

pub const TASK: &str = "it";
pub const CACHE_KEY: &str = "conveyor.cache.it";
pub const QUEUE_KEY: &str = "conveyor.queue.it";

pub fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

/// `n` header-led CSV rows: `id,name` / `1,user1` ...
pub fn people_csv(n: usize) -> NamedTempFile {
    let mut contents = String::from("id,name\n");
    for i in 1..=n {
        contents.push_str(&format!("{i},user{i}\n"));
    }
    temp_file(&contents)
}

/// A file task keyed [`TASK`], with `extra` appended under the `file` section.
pub fn file_task(path: &Path, limit: usize, extra: &str) -> TaskConfig {
    TaskConfig::from_yaml(&format!(
        "reader: file\nstate:\n  key: {TASK}\nfile:\n  path: {}\n{extra}sync:\n  limit: {limit}\n  sleep: 0\n",
        path.display()
    ))
    .expect("valid task")
}

pub fn options(page_size: usize) -> SyncOptions {
    SyncOptions {
        page_size,
        scale: 1000,
        blocking: true,
        sleep: Duration::from_millis(1),
    }
}

pub fn engine(
    source: Box<dyn DataSource>,
    checkpoints: Arc<dyn CheckpointStore>,
    queue: Arc<dyn OutputQueue>,
    options: SyncOptions,
    transformer: PageTransformer,
) -> MigrationEngine {
    MigrationEngine::new(
        source,
        checkpoints,
        queue,
        TaskKeys::with_default_prefixes(TASK),
        options,
        transformer,
    )
    .expect("valid engine")
}

pub async fn queued_json(queue: &dyn OutputQueue) -> Vec<Json> {
    queue
        .range(QUEUE_KEY, 0, -1)
        .await
        .expect("read queue")
        .iter()
        .map(|item| serde_json::from_str(item).expect("queue item is JSON"))
        .collect()
}

/// Ids of the queued records, in queue order.
pub async fn queued_ids(queue: &dyn OutputQueue) -> Vec<i64> {
    queued_json(queue)
        .await
        .iter()
        .map(|record| match &record["id"] {
            Json::String(s) => s.parse().expect("numeric id"),
            other => other.as_i64().expect("numeric id"),
        })
        .collect()
}

fn injected(what: &str) -> StateStoreError {
    StateStoreError::CorruptedList(format!("injected {what} failure"))
}

/// Output queue over a [`MemoryStore`] that records every push, the queue
/// length right after it, and can fail a chosen push (0-based).
pub struct RecordingQueue {
    inner: Arc<MemoryStore>,
    fail_on: Option<usize>,
    calls: AtomicUsize,
    pub pushes: Mutex<Vec<Vec<String>>>,
    pub max_len: AtomicU64,
}

impl RecordingQueue {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_on: None,
            calls: AtomicUsize::new(0),
            pushes: Mutex::new(Vec::new()),
            max_len: AtomicU64::new(0),
        }
    }

    pub fn failing_on(inner: Arc<MemoryStore>, push: usize) -> Self {
        Self {
            fail_on: Some(push),
            ..Self::new(inner)
        }
    }

    pub fn pushes(&self) -> Vec<Vec<String>> {
        self.pushes.lock().expect("pushes lock").clone()
    }
}

#[async_trait]
impl OutputQueue for RecordingQueue {
    async fn push(&self, key: &str, items: &[String]) -> Result<(), StateStoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(injected("push"));
        }
        self.inner.push(key, items).await?;
        let len = self.inner.len(key).await?;
        self.max_len.fetch_max(len, Ordering::SeqCst);
        self.pushes.lock().expect("pushes lock").push(items.to_vec());
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64, StateStoreError> {
        self.inner.len(key).await
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        self.inner.pop(key).await
    }

    async fn pop_many(&self, key: &str, count: usize) -> Result<Vec<String>, StateStoreError> {
        self.inner.pop_many(key, count).await
    }

    async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StateStoreError> {
        self.inner.range(key, start, end).await
    }

    async fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        self.inner.delete(key).await
    }
}

/// Checkpoint store over a [`MemoryStore`] that keeps every multi-field write
/// and can fail a chosen one (0-based).
pub struct RecordingCheckpoints {
    inner: Arc<MemoryStore>,
    fail_on: Option<usize>,
    calls: AtomicUsize,
    pub writes: Mutex<Vec<Map<String, Json>>>,
}

impl RecordingCheckpoints {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_on: None,
            calls: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(inner: Arc<MemoryStore>, write: usize) -> Self {
        Self {
            fail_on: Some(write),
            ..Self::new(inner)
        }
    }

    pub fn writes(&self) -> Vec<Map<String, Json>> {
        self.writes.lock().expect("writes lock").clone()
    }
}

#[async_trait]
impl CheckpointStore for RecordingCheckpoints {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Json>, StateStoreError> {
        self.inner.get(key, field).await
    }

    async fn get_all(&self, key: &str) -> Result<Map<String, Json>, StateStoreError> {
        self.inner.get_all(key).await
    }

    async fn set_field(&self, key: &str, field: &str, value: &Json) -> Result<(), StateStoreError> {
        self.inner.set_field(key, field, value).await
    }

    async fn set_fields(&self, key: &str, values: &Map<String, Json>) -> Result<(), StateStoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(injected("checkpoint"));
        }
        self.inner.set_fields(key, values).await?;
        self.writes.lock().expect("writes lock").push(values.clone());
        Ok(())
    }

    async fn has_field(&self, key: &str, field: &str) -> Result<bool, StateStoreError> {
        self.inner.has_field(key, field).await
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<(), StateStoreError> {
        self.inner.delete_fields(key, fields).await
    }

    async fn delete_all(&self, key: &str) -> Result<(), StateStoreError> {
        self.inner.delete_all(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StateStoreError> {
        self.inner.exists(key).await
    }
}

/// In-memory `users` table of the `shop` database with an integer `id` key.
pub struct FakeTable {
    rows: Vec<(i64, String)>,
    pub queries: Mutex<Vec<BoundQuery>>,
    pub closed: Arc<Mutex<bool>>,
}

impl FakeTable {
    pub fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        FakeTable {
            rows: ids.into_iter().map(|id| (id, format!("user{id}"))).collect(),
            queries: Mutex::new(Vec::new()),
            closed: Arc::new(Mutex::new(false)),
        }
    }
}

#[async_trait]
impl SqlClient for FakeTable {
    fn dialect(&self) -> &dyn Dialect {
        &MySql
    }

    fn database(&self) -> &str {
        "shop"
    }

    async fn fetch_rows(&self, query: &BoundQuery, entity: &str) -> Result<Vec<RowData>, DbError> {
        self.queries.lock().expect("queries lock").push(query.clone());
        let after = query.params.first().and_then(Value::as_u64).map(|v| v as i64);
        let limit: usize = query
            .sql
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(usize::MAX);

        Ok(self
            .rows
            .iter()
            .filter(|(id, _)| after.is_none_or(|after| *id > after))
            .take(limit)
            .map(|(id, name)| {
                RowData::new(
                    entity,
                    vec![
                        FieldValue::new("id", Value::Int(*id)),
                        FieldValue::new("name", Value::String(name.clone())),
                    ],
                )
            })
            .collect())
    }

    async fn fetch_count(&self, _sql: &str) -> Result<u64, DbError> {
        Ok(self.rows.len() as u64)
    }

    async fn close(&mut self) -> Result<(), DbError> {
        *self.closed.lock().expect("closed lock") = true;
        Ok(())
    }
}

pub fn oid(n: u32) -> Json {
    json!({ "$oid": format!("{n:024x}") })
}

fn oid_hex(id: &Json) -> String {
    id["$oid"].as_str().unwrap_or_default().to_string()
}

/// In-memory `app.users` collection whose `_id`s are ObjectIds.
pub struct FakeCollection {
    docs: Vec<Json>,
}

impl FakeCollection {
    pub fn with_docs(n: u32) -> Self {
        FakeCollection {
            docs: (1..=n)
                .map(|i| json!({ "_id": oid(i), "id": i, "name": format!("user{i}") }))
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentClient for FakeCollection {
    fn database(&self) -> &str {
        "app"
    }

    fn collection(&self) -> &str {
        "users"
    }

    async fn count(&self) -> Result<u64, DocumentError> {
        Ok(self.docs.len() as u64)
    }

    async fn find_page(&self, request: &PageRequest) -> Result<Vec<Map<String, Json>>, DocumentError> {
        let after = request.after.as_ref().map(oid_hex);
        Ok(self
            .docs
            .iter()
            .filter(|doc| after.as_ref().is_none_or(|after| oid_hex(&doc["_id"]) > *after))
            .take(request.limit)
            .filter_map(|doc| doc.as_object().cloned())
            .collect())
    }

    async fn close(&mut self) -> Result<(), DocumentError> {
        Ok(())
    }
}
