use crate::{
    core::value::Value,
    error::ModelError,
    records::row::RowData,
    transform::appendix::Appendix,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A record travelling from a source adapter to the output queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Keyed record: table row, document, or a file line zipped with its header.
    Row(RowData),
    /// Raw text line from a headerless delimited file.
    Line(String),
}

impl Record {
    pub fn get_value(&self, field: &str) -> Option<&Value> {
        match self {
            Record::Row(row) => row.get(field).map(|f| &f.value),
            Record::Line(_) => None,
        }
    }

    /// Drops every field not listed in `columns`. Lines have no fields to drop.
    pub fn retain_fields(&mut self, columns: &HashSet<&str>) {
        if let Record::Row(row) = self {
            row.retain(columns);
        }
    }

    /// Applies one appendix. Keyed appendices set a field on rows; raw appendices
    /// are joined onto lines with `delimiter`. Mismatched pairs are left untouched.
    pub fn append(&mut self, appendix: &Appendix, delimiter: char) {
        match (self, appendix) {
            (Record::Row(row), Appendix::Field { key, value }) => {
                row.set(key, Value::String(value.clone()));
            }
            (Record::Line(line), Appendix::Raw(raw)) => {
                line.push(delimiter);
                line.push_str(raw);
            }
            (Record::Line(line), Appendix::Field { key, value }) => {
                line.push(delimiter);
                line.push_str(key);
                line.push(':');
                line.push_str(value);
            }
            (Record::Row(_), Appendix::Raw(_)) => {}
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Record::Row(row) => serde_json::Value::Object(row.to_json()),
            Record::Line(line) => serde_json::Value::String(line.clone()),
        }
    }

    /// Serialized form pushed onto the output queue.
    pub fn to_queue_item(&self) -> Result<String, ModelError> {
        serde_json::to_string(&self.to_json()).map_err(ModelError::from)
    }
}

impl From<RowData> for Record {
    fn from(row: RowData) -> Self {
        Record::Row(row)
    }
}
