use connectors::error::AdapterError;
use engine_core::error::{ProgressError, StateStoreError};
use model::error::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source error: {0}")]
    Source(#[from] AdapterError),

    #[error("State store operation failed: {0}")]
    Store(#[from] StateStoreError),

    #[error("Failed to prepare record for the queue: {0}")]
    Record(#[from] ModelError),

    #[error("Failed to read progress: {0}")]
    Progress(#[from] ProgressError),

    #[error("Invalid sync options: {0}")]
    InvalidOptions(String),
}
