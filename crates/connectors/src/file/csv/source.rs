use crate::{
    error::AdapterError,
    file::{
        error::FileError,
        paging::{PagedReader, RecordReader},
    },
    source::DataSource,
};
use async_trait::async_trait;
use model::{
    core::value::{FieldValue, Value},
    pagination::{
        cursor::{Cursor, CursorKind},
        page::FetchResult,
    },
    records::{record::Record, row::RowData},
    transform::appendix::Appendix,
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

pub const LINE_CURSOR_FIELD: &str = "line";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSettings {
    pub delimiter: char,
    pub has_header: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: ',',
            has_header: true,
        }
    }
}

enum CsvLines {
    /// Lines zipped with the header into keyed rows.
    Keyed {
        reader: csv::Reader<File>,
        header: Vec<String>,
        entity: String,
    },
    /// Headerless file, lines are passed through verbatim.
    Raw { lines: io::Lines<BufReader<File>> },
}

impl RecordReader for CsvLines {
    fn next_record(&mut self) -> Result<Option<Record>, FileError> {
        match self {
            CsvLines::Keyed {
                reader,
                header,
                entity,
            } => {
                let mut record = csv::StringRecord::new();
                if !reader.read_record(&mut record)? {
                    return Ok(None);
                }
                let fields = header
                    .iter()
                    .zip(record.iter())
                    .map(|(name, cell)| FieldValue::new(name.clone(), Value::from(cell)))
                    .collect();
                Ok(Some(Record::Row(RowData::new(entity, fields))))
            }
            CsvLines::Raw { lines } => match lines.next() {
                Some(line) => Ok(Some(Record::Line(line?.trim_end_matches('\r').to_string()))),
                None => Ok(None),
            },
        }
    }
}

/// Delimited text file paged by line number.
pub struct CsvDataSource {
    path: PathBuf,
    settings: CsvSettings,
    entity: String,
    pager: PagedReader<CsvLines>,
}

impl CsvDataSource {
    pub fn new(path: impl Into<PathBuf>, settings: CsvSettings) -> Result<Self, FileError> {
        let path = path.into();
        if !path.is_file() {
            return Err(FileError::NotFound(path.display().to_string()));
        }
        if !settings.delimiter.is_ascii() {
            return Err(FileError::InvalidDelimiter(settings.delimiter));
        }
        let entity = entity_name(&path);
        Ok(CsvDataSource {
            path,
            settings,
            entity,
            pager: PagedReader::new(),
        })
    }

    fn reader_builder(settings: &CsvSettings) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(settings.delimiter as u8)
            .has_headers(settings.has_header)
            .flexible(true);
        builder
    }

    fn open(path: &Path, settings: &CsvSettings, entity: &str) -> Result<CsvLines, FileError> {
        let file = File::open(path)?;
        info!("{} opened...", path.display());
        if settings.has_header {
            let mut reader = Self::reader_builder(settings).from_reader(file);
            let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            info!(?header, "header parsed");
            Ok(CsvLines::Keyed {
                reader,
                header,
                entity: entity.to_string(),
            })
        } else {
            Ok(CsvLines::Raw {
                lines: BufReader::new(file).lines(),
            })
        }
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn cursor_kind(&self) -> CursorKind {
        CursorKind::Line
    }

    fn cursor_field(&self) -> &str {
        LINE_CURSOR_FIELD
    }

    /// Data lines, header excluded.
    async fn count(&mut self) -> Result<u64, AdapterError> {
        let file = File::open(&self.path).map_err(FileError::from)?;
        let total = if self.settings.has_header {
            let mut reader = Self::reader_builder(&self.settings).from_reader(file);
            let mut record = csv::ByteRecord::new();
            let mut total = 0u64;
            while reader.read_byte_record(&mut record).map_err(FileError::from)? {
                total += 1;
            }
            total
        } else {
            let mut total = 0u64;
            for line in BufReader::new(file).lines() {
                line.map_err(FileError::from)?;
                total += 1;
            }
            total
        };
        debug!(path = %self.path.display(), total, "counted lines");
        Ok(total)
    }

    async fn next_page(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<FetchResult, AdapterError> {
        let (path, settings, entity) = (&self.path, &self.settings, &self.entity);
        let page = self
            .pager
            .read_page(cursor, page_size, || Self::open(path, settings, entity))?;
        Ok(page)
    }

    /// Keyed rows get `key:value` fields; headerless lines get each appendix
    /// joined on with the file's delimiter.
    fn decorate(&self, mut records: Vec<Record>, appendices: &[Appendix]) -> Vec<Record> {
        for record in records.iter_mut() {
            for appendix in appendices {
                record.append(appendix, self.settings.delimiter);
            }
        }
        records
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.pager.close();
        Ok(())
    }
}

pub(crate) fn entity_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
