//! Task operations that only touch the stores, usable without opening the
//! source (e.g. from a monitoring process).

use crate::error::EngineError;
use engine_core::{
    keys::TaskKeys,
    progress::{ProgressService, ProgressStatus},
    queue::OutputQueue,
    state::CheckpointStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::info;

/// What `clear` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    /// The checkpoint hash only; the next sync starts from scratch.
    Status,
    /// The queued backlog only.
    Queue,
    All,
}

impl ClearScope {
    pub fn clears_checkpoint(&self) -> bool {
        matches!(self, ClearScope::Status | ClearScope::All)
    }

    pub fn clears_queue(&self) -> bool {
        matches!(self, ClearScope::Queue | ClearScope::All)
    }
}

impl FromStr for ClearScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "status" | "checkpoint" => Ok(ClearScope::Status),
            "queue" => Ok(ClearScope::Queue),
            "all" => Ok(ClearScope::All),
            other => Err(EngineError::InvalidOptions(format!(
                "unknown clear scope '{other}', expected status, queue or all"
            ))),
        }
    }
}

impl fmt::Display for ClearScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClearScope::Status => "status",
            ClearScope::Queue => "queue",
            ClearScope::All => "all",
        };
        f.write_str(name)
    }
}

/// Checkpoint and queue handles of one task.
#[derive(Clone)]
pub struct TaskControl {
    checkpoints: Arc<dyn CheckpointStore>,
    queue: Arc<dyn OutputQueue>,
    keys: TaskKeys,
}

impl TaskControl {
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        queue: Arc<dyn OutputQueue>,
        keys: TaskKeys,
    ) -> Self {
        Self {
            checkpoints,
            queue,
            keys,
        }
    }

    pub fn keys(&self) -> &TaskKeys {
        &self.keys
    }

    /// Read-only snapshot, safe next to a running sync.
    pub async fn status(
        &self,
        cursor_field: &str,
        identifiers: Map<String, Json>,
    ) -> Result<ProgressStatus, EngineError> {
        let progress = ProgressService::new(self.checkpoints.clone(), self.queue.clone());
        Ok(progress
            .task_status(&self.keys, cursor_field, identifiers)
            .await?)
    }

    pub async fn clear(&self, scope: ClearScope) -> Result<(), EngineError> {
        if scope.clears_checkpoint() {
            self.checkpoints.delete_all(&self.keys.cache).await?;
            info!(key = %self.keys.cache, "checkpoint cleared");
        }
        if scope.clears_queue() {
            self.queue.delete(&self.keys.queue).await?;
            info!(key = %self.keys.queue, "queue cleared");
        }
        Ok(())
    }
}
