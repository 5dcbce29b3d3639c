use crate::error::AdapterError;
use async_trait::async_trait;
use model::{
    pagination::{
        cursor::{Cursor, CursorKind},
        page::FetchResult,
    },
    records::record::Record,
    transform::appendix::Appendix,
};
use std::collections::HashSet;

/// A pageable data source: delimited file, JSON-lines file, relational table or
/// document collection.
///
/// Every variant pages strictly after a cursor that is monotonic in the source's
/// natural order (line number, primary key, document id), so "after cursor X"
/// is stable across process restarts.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short human readable name used in logs, e.g. `shop.orders`.
    fn describe(&self) -> String;

    fn cursor_kind(&self) -> CursorKind;

    /// Checkpoint field holding the cursor (`line`, the primary key, `_id`).
    fn cursor_field(&self) -> &str;

    /// Number of extractable records right now.
    async fn count(&mut self) -> Result<u64, AdapterError>;

    /// Up to `page_size` records strictly after `cursor`. An exhausted source
    /// returns an empty page with [`Cursor::None`].
    async fn next_page(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<FetchResult, AdapterError>;

    /// Drops fields not in `columns`; no-op without a projection.
    fn project(&self, mut records: Vec<Record>, columns: &[String]) -> Vec<Record> {
        if columns.is_empty() {
            return records;
        }
        let keep: HashSet<&str> = columns.iter().map(String::as_str).collect();
        for record in records.iter_mut() {
            record.retain_fields(&keep);
        }
        records
    }

    /// Injects the static appendices into every record.
    fn decorate(&self, mut records: Vec<Record>, appendices: &[Appendix]) -> Vec<Record> {
        if appendices.is_empty() {
            return records;
        }
        for record in records.iter_mut() {
            for appendix in appendices {
                record.append(appendix, ',');
            }
        }
        records
    }

    /// Releases any connection held by the source.
    async fn close(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}
