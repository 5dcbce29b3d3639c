use crate::error::StateStoreError;
use async_trait::async_trait;
use serde_json::{Map, Value as Json};

pub mod memory;
pub mod redis_store;
pub mod sled_store;

/// Fixed fields of a task's checkpoint hash. The cursor field is named after
/// the source's key (`line`, the primary key, `_id`).
pub mod fields {
    pub const TOTAL: &str = "total";
    pub const COUNT: &str = "count";
    pub const PAGE: &str = "page";
    pub const RECORD: &str = "record";
}

/// Hash of checkpoint fields per task key. Values are stored as JSON text
/// and read back as JSON; reading a missing field yields `None`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Json>, StateStoreError>;

    async fn get_all(&self, key: &str) -> Result<Map<String, Json>, StateStoreError>;

    async fn set_field(&self, key: &str, field: &str, value: &Json) -> Result<(), StateStoreError>;

    /// Writes every field of `values` in one operation.
    async fn set_fields(&self, key: &str, values: &Map<String, Json>) -> Result<(), StateStoreError>;

    async fn has_field(&self, key: &str, field: &str) -> Result<bool, StateStoreError>;

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<(), StateStoreError>;

    async fn delete_all(&self, key: &str) -> Result<(), StateStoreError>;

    /// True when the hash has at least one field.
    async fn exists(&self, key: &str) -> Result<bool, StateStoreError>;
}

/// Decodes a stored field. Text written by another producer that is not
/// valid JSON is returned as a JSON string rather than failing the read.
pub(crate) fn decode(raw: &[u8]) -> Json {
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Json::String(String::from_utf8_lossy(raw).into_owned()))
}
