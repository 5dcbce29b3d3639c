use crate::{error::ConfigError, settings::validator::TaskValidator};
use connectors::{document::source::DEFAULT_ID_FIELD, file::csv::source::LINE_CURSOR_FIELD};
use engine_core::keys::{DEFAULT_CACHE_PREFIX, DEFAULT_QUEUE_PREFIX, TaskKeys};
use model::transform::appendix::Appendix;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    Mysql,
    Mongo,
    File,
    /// Same as `file`.
    Csv,
    Json,
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderKind::Mysql => "mysql",
            ReaderKind::Mongo => "mongo",
            ReaderKind::File => "file",
            ReaderKind::Csv => "csv",
            ReaderKind::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Redis,
    Sled,
}

/// Where checkpoints and the output queue live, and under which keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub url: String,
    /// sled database directory.
    pub path: PathBuf,
    /// The task key.
    pub key: String,
    pub cache_key_prefix: String,
    pub queue_key_prefix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            backend: StateBackend::Redis,
            url: "redis://127.0.0.1:6379/0".into(),
            path: PathBuf::from("~/.conveyor/state"),
            key: "CONVEYOR_TASK".into(),
            cache_key_prefix: DEFAULT_CACHE_PREFIX.into(),
            queue_key_prefix: DEFAULT_QUEUE_PREFIX.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlSection {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    pub table: String,
    pub pk: String,
    pub column: Vec<String>,
    pub appendices: Vec<String>,
    pub append_db_info: bool,
}

impl Default for MySqlSection {
    fn default() -> Self {
        MySqlSection {
            host: "localhost".into(),
            port: 3306,
            db: String::new(),
            user: String::new(),
            password: String::new(),
            table: String::new(),
            pk: "id".into(),
            column: Vec::new(),
            appendices: Vec::new(),
            append_db_info: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoSection {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    pub collection: String,
    pub pk: String,
    pub column: Vec<String>,
    pub appendices: Vec<String>,
}

impl Default for MongoSection {
    fn default() -> Self {
        MongoSection {
            host: "localhost".into(),
            port: 27017,
            db: String::new(),
            user: String::new(),
            password: String::new(),
            collection: String::new(),
            pk: DEFAULT_ID_FIELD.into(),
            column: Vec::new(),
            appendices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSection {
    pub path: Option<PathBuf>,
    /// A single character; `\t` written as two characters means TAB.
    pub delimiter: String,
    pub header: bool,
    pub appendices: Vec<String>,
}

impl Default for FileSection {
    fn default() -> Self {
        FileSection {
            path: None,
            delimiter: ",".into(),
            header: true,
            appendices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonSection {
    pub path: Option<PathBuf>,
    pub appendices: Vec<String>,
}

/// Paging and backpressure knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Page size.
    pub limit: usize,
    /// The queue may hold at most `limit * scale` items before the engine waits.
    pub scale: usize,
    pub block: bool,
    /// Seconds to wait before re-checking the queue depth.
    pub sleep: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        SyncSection {
            limit: 1000,
            scale: 3,
            block: true,
            sleep: 10,
        }
    }
}

/// Command line overrides of the `sync` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOverrides {
    pub limit: Option<usize>,
    pub scale: Option<usize>,
    pub block: Option<bool>,
    pub sleep: Option<u64>,
}

/// A fully resolved task: one reader, its section, the state backend and
/// the sync knobs. Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub reader: ReaderKind,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub mysql: MySqlSection,
    #[serde(default)]
    pub mongo: MongoSection,
    #[serde(default, alias = "csv")]
    pub file: FileSection,
    #[serde(default)]
    pub json: JsonSection,
    #[serde(default)]
    pub sync: SyncSection,
}

impl TaskConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("config_path is {}", path.display());
        Self::from_yaml(&content)
    }

    /// Parses, normalizes and validates a YAML task file.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: TaskConfig = serde_yaml::from_str(yaml)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        TaskValidator::new(self).validate()
    }

    /// `\t` delimiter to TAB and `~` to the home directory.
    fn normalize(&mut self) {
        if self.file.delimiter == "\\t" {
            self.file.delimiter = "\t".into();
        }
        self.file.path = self.file.path.take().map(expand_home);
        self.json.path = self.json.path.take().map(expand_home);
        self.state.path = expand_home(std::mem::take(&mut self.state.path));
    }

    pub fn apply_overrides(&mut self, overrides: &SyncOverrides) -> Result<(), ConfigError> {
        if let Some(limit) = overrides.limit {
            self.sync.limit = limit;
        }
        if let Some(scale) = overrides.scale {
            self.sync.scale = scale;
        }
        if let Some(block) = overrides.block {
            self.sync.block = block;
        }
        if let Some(sleep) = overrides.sleep {
            self.sync.sleep = sleep;
        }
        self.validate()
    }

    pub fn keys(&self) -> TaskKeys {
        TaskKeys::new(
            &self.state.key,
            &self.state.cache_key_prefix,
            &self.state.queue_key_prefix,
        )
    }

    /// Headerless delimited files take their appendices verbatim.
    pub fn keyed_records(&self) -> bool {
        match self.reader {
            ReaderKind::File | ReaderKind::Csv => self.file.header,
            _ => true,
        }
    }

    pub fn raw_appendices(&self) -> &[String] {
        match self.reader {
            ReaderKind::Mysql => &self.mysql.appendices,
            ReaderKind::Mongo => &self.mongo.appendices,
            ReaderKind::File | ReaderKind::Csv => &self.file.appendices,
            ReaderKind::Json => &self.json.appendices,
        }
    }

    pub fn appendices(&self) -> Result<Vec<Appendix>, ConfigError> {
        Appendix::parse_all(self.raw_appendices(), self.keyed_records())
            .map_err(|e| ConfigError::ValidationFailed(vec![e.to_string()]))
    }

    /// Column projection; empty keeps every field.
    pub fn columns(&self) -> &[String] {
        match self.reader {
            ReaderKind::Mysql => &self.mysql.column,
            ReaderKind::Mongo => &self.mongo.column,
            _ => &[],
        }
    }

    /// Checkpoint field that holds the cursor for this reader.
    pub fn cursor_field(&self) -> &str {
        match self.reader {
            ReaderKind::Mysql => &self.mysql.pk,
            ReaderKind::Mongo => &self.mongo.pk,
            ReaderKind::File | ReaderKind::Csv | ReaderKind::Json => LINE_CURSOR_FIELD,
        }
    }

    /// Names the data the task reads, reported next to its progress.
    pub fn identifiers(&self) -> Map<String, Json> {
        let mut ids = Map::new();
        match self.reader {
            ReaderKind::Mysql => {
                ids.insert("db".into(), Json::from(self.mysql.db.clone()));
                ids.insert("table".into(), Json::from(self.mysql.table.clone()));
            }
            ReaderKind::Mongo => {
                ids.insert("db".into(), Json::from(self.mongo.db.clone()));
                ids.insert("collection".into(), Json::from(self.mongo.collection.clone()));
            }
            ReaderKind::File | ReaderKind::Csv => {
                ids.insert("path".into(), path_json(self.file.path.as_deref()));
            }
            ReaderKind::Json => {
                ids.insert("path".into(), path_json(self.json.path.as_deref()));
            }
        }
        ids
    }
}

fn path_json(path: Option<&Path>) -> Json {
    path.map(|p| Json::from(p.display().to_string()))
        .unwrap_or(Json::Null)
}

pub fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_is_merged_over_defaults() {
        let config = TaskConfig::from_yaml(
            r#"
reader: mysql
mysql:
  db: shop
  table: orders
  column: [id, name]
sync:
  limit: 500
"#,
        )
        .unwrap();

        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.mysql.pk, "id");
        assert_eq!(config.sync.limit, 500);
        assert_eq!(config.sync.scale, 3);
        assert!(config.sync.block);
        assert_eq!(config.state.backend, StateBackend::Redis);
        assert_eq!(config.keys().cache, "conveyor.cache.CONVEYOR_TASK");
        assert_eq!(config.cursor_field(), "id");
        assert_eq!(config.columns(), ["id".to_string(), "name".to_string()]);
        assert_eq!(config.identifiers()["table"], Json::from("orders"));
    }

    #[test]
    fn tab_delimiter_and_csv_alias() {
        let config = TaskConfig::from_yaml(
            r#"
reader: csv
csv:
  path: /tmp/data.tsv
  delimiter: "\\t"
  header: false
  appendices: [tag1]
"#,
        )
        .unwrap();
        assert_eq!(config.file.delimiter, "\t");
        assert!(!config.keyed_records());
        assert_eq!(config.appendices().unwrap(), vec![Appendix::Raw("tag1".into())]);
        assert_eq!(config.cursor_field(), "line");
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config =
            TaskConfig::from_yaml("reader: json\njson:\n  path: /tmp/a.jsonl\n").unwrap();
        config
            .apply_overrides(&SyncOverrides {
                limit: Some(10),
                block: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.sync.limit, 10);
        assert!(!config.sync.block);
        assert_eq!(config.sync.sleep, 10);
    }

    #[test]
    fn home_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(PathBuf::from("~/x/y")), home.join("x/y"));
        }
        assert_eq!(expand_home(PathBuf::from("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = TaskConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
