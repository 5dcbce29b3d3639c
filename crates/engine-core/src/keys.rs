//! Namespacing of one task's checkpoint hash and queue list.

pub const DEFAULT_CACHE_PREFIX: &str = "conveyor.cache.";
pub const DEFAULT_QUEUE_PREFIX: &str = "conveyor.queue.";

/// Backend keys owned by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskKeys {
    pub task: String,
    /// Key of the checkpoint hash.
    pub cache: String,
    /// Key of the output queue list.
    pub queue: String,
}

impl TaskKeys {
    pub fn new(task: &str, cache_prefix: &str, queue_prefix: &str) -> Self {
        TaskKeys {
            task: task.to_string(),
            cache: format!("{cache_prefix}{task}"),
            queue: format!("{queue_prefix}{task}"),
        }
    }

    pub fn with_default_prefixes(task: &str) -> Self {
        Self::new(task, DEFAULT_CACHE_PREFIX, DEFAULT_QUEUE_PREFIX)
    }
}
