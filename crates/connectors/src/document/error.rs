use thiserror::Error;

/// Errors coming from the document store layer.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A document identifier that cannot be turned back into a BSON value.
    #[error("Invalid document identifier: {0}")]
    InvalidId(String),

    #[error("Document is missing identifier field '{0}'")]
    MissingId(String),

    #[error("Connection to {0} is closed")]
    Closed(String),
}
