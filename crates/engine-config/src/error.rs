use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or checking a task configuration. Every one of
/// them is fatal and raised before any extraction begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// One or more checks failed; every failure is listed.
    #[error("Invalid task configuration:\n  - {}", .0.join("\n  - "))]
    ValidationFailed(Vec<String>),

    #[error("Unknown task template '{0}'")]
    UnknownTemplate(String),
}
