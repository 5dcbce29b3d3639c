use thiserror::Error;

/// Errors coming from the relational query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// A row came back without the key column the pager orders on.
    #[error("Row is missing key column '{0}'")]
    MissingKey(String),

    /// The cursor handed to the pager is not a key cursor.
    #[error("Invalid cursor for key-range paging: {0}")]
    InvalidCursor(String),

    /// The count query returned no usable total.
    #[error("Count query returned no total for {0}")]
    MissingTotal(String),

    /// The source was used after `close()`.
    #[error("Connection to {0} is closed")]
    Closed(String),
}
