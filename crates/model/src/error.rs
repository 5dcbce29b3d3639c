use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed appendix '{0}', expected key:value")]
    MalformedAppendix(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}
