use connectors::{
    error::{AdapterError, ConnectorError},
    file::error::FileError,
};
use engine_config::error::ConfigError;
use engine_core::error::StateStoreError;
use engine_processing::error::EngineError;
use thiserror::Error;

/// Top-level errors of a task run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The task file is unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source could not be reached.
    #[error("Source unavailable: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    /// The checkpoint store or the queue could not be reached.
    #[error("State store unavailable: {0}")]
    Store(#[from] StateStoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
