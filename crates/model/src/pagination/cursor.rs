use crate::core::value::Value;
use serde::{Deserialize, Serialize};

/// How a source positions itself, used to rebuild a [`Cursor`] from the
/// checkpoint hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Files: the 1-based number of the last line consumed.
    Line,
    /// Tables and collections: the last seen key value.
    Key,
}

/// Represents the pagination cursor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Nothing read yet.
    None,

    /// Last data line consumed from a file, header excluded.
    Line { line: u64 },

    /// Last primary key / document identifier pushed (strictly increasing).
    Key { field: String, value: Value },
}

impl Cursor {
    pub fn key(field: impl Into<String>, value: Value) -> Self {
        Cursor::Key {
            field: field.into(),
            value,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cursor::None)
    }

    /// Line number for file cursors, 0 when nothing was read.
    pub fn line(&self) -> u64 {
        match self {
            Cursor::Line { line } => *line,
            _ => 0,
        }
    }

    /// The representation stored in the checkpoint hash under the cursor field.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cursor::None => serde_json::Value::Null,
            Cursor::Line { line } => serde_json::Value::from(*line),
            Cursor::Key { value, .. } => value.to_json(),
        }
    }

    /// Rebuilds a cursor from its checkpoint representation. A missing or null
    /// field, or a line cursor that is not a number, means "from the start".
    pub fn from_checkpoint(
        kind: CursorKind,
        field: &str,
        stored: Option<serde_json::Value>,
    ) -> Cursor {
        match (kind, stored) {
            (_, None) | (_, Some(serde_json::Value::Null)) => Cursor::None,
            (CursorKind::Line, Some(json)) => match json.as_u64() {
                Some(0) | None => Cursor::None,
                Some(line) => Cursor::Line { line },
            },
            (CursorKind::Key, Some(json)) => Cursor::key(field, Value::from_json(json)),
        }
    }
}
