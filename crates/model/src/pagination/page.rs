use crate::{pagination::cursor::Cursor, records::record::Record};

/// One page returned by a source adapter.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub records: Vec<Record>,
    /// Cursor of the last record in `records`; [`Cursor::None`] when the page is empty.
    pub next_cursor: Cursor,
    /// The source had fewer than `page_size` records left.
    pub reached_end: bool,
    pub row_count: usize,
    pub took_ms: u128,
}

impl FetchResult {
    pub fn new(records: Vec<Record>, next_cursor: Cursor, page_size: usize, took_ms: u128) -> Self {
        let row_count = records.len();
        FetchResult {
            records,
            next_cursor,
            reached_end: row_count < page_size,
            row_count,
            took_ms,
        }
    }

    pub fn exhausted(took_ms: u128) -> Self {
        FetchResult {
            records: Vec::new(),
            next_cursor: Cursor::None,
            reached_end: true,
            row_count: 0,
            took_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
