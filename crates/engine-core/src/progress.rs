use crate::{
    error::ProgressError,
    keys::TaskKeys,
    queue::OutputQueue,
    state::{CheckpointStore, fields},
};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct ProgressService {
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub queue: Arc<dyn OutputQueue>,
}

/// Where a task stands, derived from its checkpoint hash alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    /// No checkpoint: never started, finished, or cleared.
    Idle,
    /// `count < total`.
    Running,
    /// `count >= total`, the final page was pushed but the fields are not
    /// cleared yet.
    Draining,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "idle",
            ProgressStage::Running => "running",
            ProgressStage::Draining => "draining",
        }
    }

    pub fn derive(count: Option<u64>, total: Option<u64>) -> Self {
        match (count, total) {
            (None, None) => ProgressStage::Idle,
            (count, Some(total)) if count.unwrap_or(0) >= total => ProgressStage::Draining,
            _ => ProgressStage::Running,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub task: String,
    pub stage: ProgressStage,
    pub count: Option<u64>,
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub cursor_field: String,
    /// Last pushed key or line, `null` when nothing was pushed yet.
    pub cursor: Json,
    pub last_record: Option<Json>,
    /// Items currently waiting in the output queue.
    pub queued: u64,
    /// Where the data comes from, e.g. `db` and `table`.
    pub identifiers: Map<String, Json>,
}

impl ProgressService {
    pub fn new(checkpoints: Arc<dyn CheckpointStore>, queue: Arc<dyn OutputQueue>) -> Self {
        ProgressService { checkpoints, queue }
    }

    /// Reads the whole checkpoint hash at once so the numbers in one snapshot
    /// belong together.
    pub async fn task_status(
        &self,
        keys: &TaskKeys,
        cursor_field: &str,
        identifiers: Map<String, Json>,
    ) -> Result<ProgressStatus, ProgressError> {
        let mut hash = self.checkpoints.get_all(&keys.cache).await?;
        let queued = self.queue.len(&keys.queue).await?;

        let count = hash.get(fields::COUNT).and_then(as_counter);
        let total = hash.get(fields::TOTAL).and_then(as_counter);
        let page = hash.get(fields::PAGE).and_then(as_counter);

        Ok(ProgressStatus {
            task: keys.task.clone(),
            stage: ProgressStage::derive(count, total),
            count,
            total,
            page,
            cursor_field: cursor_field.to_string(),
            cursor: hash.remove(cursor_field).unwrap_or(Json::Null),
            last_record: hash.remove(fields::RECORD).filter(|r| !r.is_null()),
            queued,
            identifiers,
        })
    }
}

/// Counters are written as JSON numbers; text written by other tools is
/// accepted as long as it parses.
pub fn as_counter(value: &Json) -> Option<u64> {
    match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn stage_follows_counters() {
        assert_eq!(ProgressStage::derive(None, None), ProgressStage::Idle);
        assert_eq!(ProgressStage::derive(None, Some(3)), ProgressStage::Running);
        assert_eq!(ProgressStage::derive(Some(2), Some(3)), ProgressStage::Running);
        assert_eq!(ProgressStage::derive(Some(3), Some(3)), ProgressStage::Draining);
    }

    #[tokio::test]
    async fn snapshot_reads_checkpoint_and_queue() {
        let store = Arc::new(MemoryStore::new());
        let keys = TaskKeys::with_default_prefixes("orders");
        let mut values = Map::new();
        values.insert(fields::COUNT.into(), json!(1000));
        values.insert(fields::TOTAL.into(), json!("2500"));
        values.insert(fields::PAGE.into(), json!(1));
        values.insert("id".into(), json!(1000));
        values.insert(fields::RECORD.into(), json!({"id": 1000}));
        store.set_fields(&keys.cache, &values).await.unwrap();
        store.push(&keys.queue, &["{}".to_string()]).await.unwrap();

        let mut identifiers = Map::new();
        identifiers.insert("table".into(), json!("orders"));
        let service = ProgressService::new(store.clone(), store.clone());
        let status = service.task_status(&keys, "id", identifiers).await.unwrap();

        assert_eq!(status.stage, ProgressStage::Running);
        assert_eq!(status.count, Some(1000));
        assert_eq!(status.total, Some(2500));
        assert_eq!(status.cursor, json!(1000));
        assert_eq!(status.last_record, Some(json!({"id": 1000})));
        assert_eq!(status.queued, 1);
        assert_eq!(status.identifiers["table"], json!("orders"));
    }

    #[tokio::test]
    async fn idle_without_checkpoint() {
        let store = Arc::new(MemoryStore::new());
        let service = ProgressService::new(store.clone(), store);
        let status = service
            .task_status(&TaskKeys::with_default_prefixes("x"), "line", Map::new())
            .await
            .unwrap();
        assert_eq!(status.stage, ProgressStage::Idle);
        assert_eq!(status.cursor, Json::Null);
    }
}
