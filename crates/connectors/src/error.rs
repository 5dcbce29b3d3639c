use crate::{
    document::error::DocumentError, file::error::FileError, sql::base::error::DbError,
};
use thiserror::Error;

/// Errors happening while a source connection is being set up.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("MongoDB connection failed: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The backend could not be reached.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// File-related error.
    #[error("File error: {0}")]
    FileError(#[from] FileError),

    /// Database-related error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Document store error.
    #[error("Document store error: {0}")]
    Document(#[from] DocumentError),

    /// Missing required property error.
    #[error("Missing required property: {0}")]
    MissingProperty(String),
}
