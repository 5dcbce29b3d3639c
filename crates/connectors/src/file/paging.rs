use crate::file::error::FileError;
use model::{
    pagination::{cursor::Cursor, page::FetchResult},
    records::record::Record,
};
use std::time::Instant;

/// Yields file records one at a time in file order.
pub(crate) trait RecordReader: Send + Sync {
    fn next_record(&mut self) -> Result<Option<Record>, FileError>;
}

/// Keeps a file reader open across pages and tracks how many records it has
/// consumed, so consecutive pages never re-read the file from the top.
pub(crate) struct PagedReader<R> {
    reader: Option<R>,
    /// Tracks how many records have been consumed from the file.
    rows_read: u64,
}

impl<R: RecordReader> PagedReader<R> {
    pub fn new() -> Self {
        PagedReader {
            reader: None,
            rows_read: 0,
        }
    }

    /// Reads up to `page_size` records after the line named by `cursor`.
    /// Reopens the file through `open` when the cursor points behind the
    /// current position (e.g. after a resume).
    pub fn read_page<F>(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
        open: F,
    ) -> Result<FetchResult, FileError>
    where
        F: Fn() -> Result<R, FileError>,
    {
        let start = Instant::now();
        let target = match cursor {
            Cursor::None | Cursor::Line { .. } => cursor.line(),
            other => {
                return Err(FileError::InvalidCursor(format!(
                    "Unsupported cursor: {other:?}"
                )));
            }
        };

        if self.reader.is_none() || target < self.rows_read {
            self.reader = Some(open()?);
            self.rows_read = 0;
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(FetchResult::exhausted(start.elapsed().as_millis()));
        };

        // skip lines already pushed
        while self.rows_read < target {
            match reader.next_record()? {
                Some(_) => self.rows_read += 1,
                None => return Ok(FetchResult::exhausted(start.elapsed().as_millis())),
            }
        }

        let mut records = Vec::with_capacity(page_size);
        while records.len() < page_size {
            match reader.next_record()? {
                Some(record) => {
                    self.rows_read += 1;
                    records.push(record);
                }
                None => break,
            }
        }

        let next_cursor = if records.is_empty() {
            Cursor::None
        } else {
            Cursor::Line {
                line: self.rows_read,
            }
        };

        Ok(FetchResult::new(
            records,
            next_cursor,
            page_size,
            start.elapsed().as_millis(),
        ))
    }

    pub fn close(&mut self) {
        self.reader = None;
        self.rows_read = 0;
    }
}
