use thiserror::Error;

/// Failures of the checkpoint store or the output queue backend.
#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted list entry under {0}")]
    CorruptedList(String),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to read task state: {0}")]
    Store(#[from] StateStoreError),
}
