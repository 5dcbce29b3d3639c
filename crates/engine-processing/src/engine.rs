use crate::{
    control::{ClearScope, TaskControl},
    error::EngineError,
    gate::BackpressureGate,
    state_manager::{Checkpoint, CheckpointManager},
    transform::PageTransformer,
};
use connectors::source::DataSource;
use engine_core::{
    keys::TaskKeys,
    metrics::{Metrics, MetricsSnapshot},
    progress::ProgressStatus,
    queue::OutputQueue,
    state::CheckpointStore,
};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub page_size: usize,
    /// Queue depth limit in pages.
    pub scale: usize,
    pub blocking: bool,
    pub sleep: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            page_size: 1000,
            scale: 3,
            blocking: true,
            sleep: Duration::from_secs(10),
        }
    }
}

impl SyncOptions {
    fn validate(&self) -> Result<(), EngineError> {
        if self.page_size == 0 {
            return Err(EngineError::InvalidOptions(
                "page size must be at least 1".into(),
            ));
        }
        if self.scale == 0 {
            return Err(EngineError::InvalidOptions(
                "scale must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one `sync()` call.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub task: String,
    pub source: String,
    pub total: u64,
    /// The run picked up an existing checkpoint.
    pub resumed: bool,
    pub pages: u64,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
}

/// Moves one source onto one queue, page by page, checkpointing after every
/// push. A single engine owns a task key at a time.
pub struct MigrationEngine {
    source: Box<dyn DataSource>,
    queue: Arc<dyn OutputQueue>,
    keys: TaskKeys,
    checkpoints: CheckpointManager,
    control: TaskControl,
    gate: BackpressureGate,
    transformer: PageTransformer,
    options: SyncOptions,
}

impl MigrationEngine {
    pub fn new(
        source: Box<dyn DataSource>,
        checkpoints: Arc<dyn CheckpointStore>,
        queue: Arc<dyn OutputQueue>,
        keys: TaskKeys,
        options: SyncOptions,
        transformer: PageTransformer,
    ) -> Result<Self, EngineError> {
        options.validate()?;
        let manager = CheckpointManager::new(
            checkpoints.clone(),
            keys.cache.clone(),
            source.cursor_field(),
            source.cursor_kind(),
        );
        let control = TaskControl::new(checkpoints, queue.clone(), keys.clone());
        let gate = BackpressureGate::new(
            options.page_size,
            options.scale,
            options.blocking,
            options.sleep,
        );

        Ok(Self {
            source,
            queue,
            keys,
            checkpoints: manager,
            control,
            gate,
            transformer,
            options,
        })
    }

    pub fn keys(&self) -> &TaskKeys {
        &self.keys
    }

    /// Runs the task to completion, resuming from the checkpoint if one
    /// exists. On return the task's progress fields are gone.
    pub async fn sync(&mut self) -> Result<SyncReport, EngineError> {
        let started = Instant::now();
        let metrics = Metrics::new();
        let source_name = self.source.describe();

        let checkpoint = self.checkpoints.load().await?;
        let resumed = !checkpoint.is_fresh();
        let total = match checkpoint.total {
            Some(total) => {
                info!(
                    source = %source_name,
                    page = checkpoint.page,
                    count = checkpoint.count,
                    total,
                    cursor = ?checkpoint.cursor,
                    "Resuming task {}",
                    self.keys.task
                );
                total
            }
            None => {
                let total = self.source.count().await?;
                self.checkpoints.seed_total(total).await?;
                info!(source = %source_name, total, "Starting task {}", self.keys.task);
                total
            }
        };

        let Checkpoint {
            mut count,
            mut page,
            mut cursor,
            ..
        } = checkpoint;
        let page_size = self.options.page_size;

        while count < total {
            let waits = self
                .gate
                .wait_for_room(self.queue.as_ref(), &self.keys.queue)
                .await?;
            metrics.increment_waits(waits);

            let fetched = self.source.next_page(&cursor, page_size).await?;
            let took_ms = fetched.took_ms;
            let records = self
                .transformer
                .apply(self.source.as_ref(), fetched.records);
            let items = PageTransformer::serialize(&records)?;

            page += 1;
            count += page_size as u64;

            let last = if items.is_empty() {
                warn!(page, count, total, cursor = ?cursor, "source returned an empty page");
                metrics.increment_empty_pages(1);
                None
            } else {
                self.queue.push(&self.keys.queue, &items).await?;
                metrics.increment_pages(1);
                metrics.increment_records(items.len() as u64);
                if !fetched.next_cursor.is_none() {
                    cursor = fetched.next_cursor;
                }
                records.last().map(|record| (&cursor, record.to_json()))
            };
            self.checkpoints.advance(page, count, last).await?;

            debug!(
                page,
                count,
                total,
                rows = items.len(),
                took_ms = took_ms as u64,
                "page pushed"
            );
        }

        self.checkpoints.finish().await?;
        self.source.close().await?;

        let report = SyncReport {
            task: self.keys.task.clone(),
            source: source_name,
            total,
            resumed,
            pages: page,
            metrics: metrics.snapshot(),
            elapsed: started.elapsed(),
        };
        info!(
            records = report.metrics.records_pushed,
            pages = report.metrics.pages_pushed,
            waits = report.metrics.backpressure_waits,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Task {} finished",
            report.task
        );
        Ok(report)
    }

    pub async fn status(&self, identifiers: Map<String, Json>) -> Result<ProgressStatus, EngineError> {
        self.control
            .status(self.source.cursor_field(), identifiers)
            .await
    }

    pub async fn clear(&self, scope: ClearScope) -> Result<(), EngineError> {
        self.control.clear(scope).await
    }
}
