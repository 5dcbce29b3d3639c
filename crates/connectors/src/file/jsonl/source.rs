use crate::{
    error::AdapterError,
    file::{
        csv::source::{LINE_CURSOR_FIELD, entity_name},
        error::FileError,
        paging::{PagedReader, RecordReader},
    },
    source::DataSource,
};
use async_trait::async_trait;
use model::{
    pagination::{
        cursor::{Cursor, CursorKind},
        page::FetchResult,
    },
    records::{record::Record, row::RowData},
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

struct JsonLines {
    lines: io::Lines<BufReader<File>>,
    entity: String,
    /// Physical line number, only used for error reporting.
    line_no: u64,
}

impl RecordReader for JsonLines {
    fn next_record(&mut self) -> Result<Option<Record>, FileError> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let json: serde_json::Value =
                serde_json::from_str(line).map_err(|e| FileError::InvalidJson {
                    line: self.line_no,
                    message: e.to_string(),
                })?;
            return match json {
                serde_json::Value::Object(map) => {
                    Ok(Some(Record::Row(RowData::from_json(&self.entity, map))))
                }
                other => Err(FileError::InvalidJson {
                    line: self.line_no,
                    message: format!("expected an object, found {other}"),
                }),
            };
        }
        Ok(None)
    }
}

/// One JSON object per line. Blank lines are skipped and do not count
/// towards the line cursor.
pub struct JsonLinesSource {
    path: PathBuf,
    entity: String,
    pager: PagedReader<JsonLines>,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        if !path.is_file() {
            return Err(FileError::NotFound(path.display().to_string()));
        }
        let entity = entity_name(&path);
        Ok(JsonLinesSource {
            path,
            entity,
            pager: PagedReader::new(),
        })
    }

    fn open(path: &Path, entity: &str) -> Result<JsonLines, FileError> {
        let file = File::open(path)?;
        info!("{} opened...", path.display());
        Ok(JsonLines {
            lines: BufReader::new(file).lines(),
            entity: entity.to_string(),
            line_no: 0,
        })
    }
}

#[async_trait]
impl DataSource for JsonLinesSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn cursor_kind(&self) -> CursorKind {
        CursorKind::Line
    }

    fn cursor_field(&self) -> &str {
        LINE_CURSOR_FIELD
    }

    async fn count(&mut self) -> Result<u64, AdapterError> {
        let file = File::open(&self.path).map_err(FileError::from)?;
        let mut total = 0u64;
        for line in BufReader::new(file).lines() {
            if !line.map_err(FileError::from)?.trim().is_empty() {
                total += 1;
            }
        }
        debug!(path = %self.path.display(), total, "counted json lines");
        Ok(total)
    }

    async fn next_page(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<FetchResult, AdapterError> {
        let (path, entity) = (&self.path, &self.entity);
        let page = self
            .pager
            .read_page(cursor, page_size, || Self::open(path, entity))?;
        Ok(page)
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.pager.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::transform::appendix::Appendix;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn skips_blank_lines() {
        let file = file_with("{\"id\":1}\n\n{\"id\":2}\n   \n{\"id\":3}\n");
        let mut source = JsonLinesSource::new(file.path()).unwrap();
        assert_eq!(source.count().await.unwrap(), 3);

        let page = source.next_page(&Cursor::None, 2).await.unwrap();
        assert_eq!(page.row_count, 2);
        assert_eq!(page.next_cursor, Cursor::Line { line: 2 });

        let page = source.next_page(&page.next_cursor, 2).await.unwrap();
        assert_eq!(page.records[0].to_json(), json!({"id": 3}));
        assert!(page.reached_end);
    }

    #[tokio::test]
    async fn keyed_appendix_applies() {
        let file = file_with("{\"a\":1}\n");
        let mut source = JsonLinesSource::new(file.path()).unwrap();
        let page = source.next_page(&Cursor::None, 10).await.unwrap();
        let records = source.decorate(page.records, &[Appendix::field("region", "us-east")]);
        assert_eq!(records[0].to_json(), json!({"a": 1, "region": "us-east"}));
    }

    #[tokio::test]
    async fn reports_bad_line() {
        let file = file_with("{\"a\":1}\nnot json\n");
        let mut source = JsonLinesSource::new(file.path()).unwrap();
        let err = source.next_page(&Cursor::None, 10).await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::FileError(FileError::InvalidJson { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn rejects_non_object_lines() {
        let file = file_with("[1,2]\n");
        let mut source = JsonLinesSource::new(file.path()).unwrap();
        assert!(source.next_page(&Cursor::None, 10).await.is_err());
    }
}
