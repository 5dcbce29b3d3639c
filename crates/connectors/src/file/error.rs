use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid JSON at line {line}: {message}")]
    InvalidJson { line: u64, message: String },
    #[error("Delimiter '{0}' must be a single ASCII character")]
    InvalidDelimiter(char),
    #[error("Invalid cursor for file source: {0}")]
    InvalidCursor(String),
}
