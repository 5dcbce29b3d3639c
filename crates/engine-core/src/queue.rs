use crate::error::StateStoreError;
use async_trait::async_trait;

/// FIFO list of serialized records awaiting a downstream consumer.
///
/// Items are appended at the tail and popped from the head. `range` follows
/// Redis `LRANGE` indexing: inclusive bounds, negative indices count from the
/// tail (`-1` is the last item).
#[async_trait]
pub trait OutputQueue: Send + Sync {
    /// Appends `items` in order. An empty slice is a no-op.
    async fn push(&self, key: &str, items: &[String]) -> Result<(), StateStoreError>;

    async fn len(&self, key: &str) -> Result<u64, StateStoreError>;

    async fn pop(&self, key: &str) -> Result<Option<String>, StateStoreError>;

    /// Pops up to `count` items; fewer when the queue is shorter.
    async fn pop_many(&self, key: &str, count: usize) -> Result<Vec<String>, StateStoreError>;

    async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StateStoreError>;

    async fn delete(&self, key: &str) -> Result<(), StateStoreError>;
}

/// Resolves `LRANGE`-style inclusive bounds against a list of `len` items into
/// a half-open `[from, to)` range, empty when nothing is selected.
pub(crate) fn resolve_range(len: u64, start: i64, end: i64) -> (u64, u64) {
    let len = len as i64;
    let norm = |idx: i64| if idx < 0 { len + idx } else { idx };
    let from = norm(start).max(0);
    let to = norm(end).min(len - 1);
    if len == 0 || from > to {
        return (0, 0);
    }
    (from as u64, to as u64 + 1)
}
