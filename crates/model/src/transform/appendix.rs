use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A static value injected into every migrated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Appendix {
    /// `key:value`, added as a field on keyed records.
    Field { key: String, value: String },
    /// Extra column concatenated onto headerless delimited lines.
    Raw(String),
}

impl Appendix {
    pub fn field(key: impl Into<String>, value: impl Into<String>) -> Self {
        Appendix::Field {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses the configured appendix strings. Keyed sources require the
    /// `key:value` form; headerless delimited files take each string verbatim.
    pub fn parse_all(items: &[String], keyed: bool) -> Result<Vec<Appendix>, ModelError> {
        items
            .iter()
            .map(|item| {
                if keyed {
                    item.parse()
                } else {
                    Ok(Appendix::Raw(item.clone()))
                }
            })
            .collect()
    }
}

impl FromStr for Appendix {
    type Err = ModelError;

    /// Splits on the first `:`; both sides must be non-empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                Ok(Appendix::field(key, value))
            }
            _ => Err(ModelError::MalformedAppendix(s.to_string())),
        }
    }
}

impl fmt::Display for Appendix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Appendix::Field { key, value } => write!(f, "{key}:{value}"),
            Appendix::Raw(raw) => f.write_str(raw),
        }
    }
}
