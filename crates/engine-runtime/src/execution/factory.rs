use crate::error::MigrationError;
use connectors::{
    document::{
        mongo::client::{MongoClient, MongoSettings},
        source::CollectionSource,
    },
    file::{
        csv::source::{CsvDataSource, CsvSettings},
        jsonl::source::JsonLinesSource,
    },
    source::DataSource,
    sql::{
        base::source::TableSource,
        mysql::client::{MySqlClient, MySqlSettings},
    },
};
use engine_config::{
    error::ConfigError,
    settings::task::{
        FileSection, MongoSection, MySqlSection, ReaderKind, StateBackend, StateConfig,
        SyncSection, TaskConfig,
    },
};
use engine_core::{
    queue::OutputQueue,
    state::{CheckpointStore, redis_store::RedisStore, sled_store::SledStore},
};
use engine_processing::{engine::SyncOptions, transform::PageTransformer};
use std::{path::Path, sync::Arc, time::Duration};
use tracing::info;

/// The checkpoint store and output queue of a task. Both backends keep them
/// side by side, so the two handles usually point at the same store.
#[derive(Clone)]
pub struct TaskStores {
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub queue: Arc<dyn OutputQueue>,
}

impl TaskStores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CheckpointStore + OutputQueue + 'static,
    {
        TaskStores {
            checkpoints: store.clone(),
            queue: store,
        }
    }
}

pub async fn open_stores(state: &StateConfig) -> Result<TaskStores, MigrationError> {
    match state.backend {
        StateBackend::Redis => {
            let store = RedisStore::connect(&state.url).await?;
            Ok(TaskStores::shared(Arc::new(store)))
        }
        StateBackend::Sled => {
            let store = SledStore::open(&state.path)?;
            Ok(TaskStores::shared(Arc::new(store)))
        }
    }
}

/// Opens the reader named by the task. Database sources connect here, so an
/// unreachable server fails before any checkpoint is touched.
pub async fn create_source(config: &TaskConfig) -> Result<Box<dyn DataSource>, MigrationError> {
    let source: Box<dyn DataSource> = match config.reader {
        ReaderKind::Mysql => Box::new(mysql_source(&config.mysql).await?),
        ReaderKind::Mongo => Box::new(mongo_source(&config.mongo).await?),
        ReaderKind::File | ReaderKind::Csv => Box::new(file_source(&config.file)?),
        ReaderKind::Json => {
            let path = required_path(config.json.path.as_deref(), "json.path")?;
            Box::new(JsonLinesSource::new(path)?)
        }
    };
    info!(reader = %config.reader, source = %source.describe(), "source ready");
    Ok(source)
}

async fn mysql_source(section: &MySqlSection) -> Result<TableSource<MySqlClient>, MigrationError> {
    let client = MySqlClient::connect(&MySqlSettings {
        host: section.host.clone(),
        port: section.port,
        db: section.db.clone(),
        user: section.user.clone(),
        password: section.password.clone(),
    })
    .await?;
    let source = TableSource::new(
        client,
        section.table.clone(),
        section.pk.clone(),
        section.column.clone(),
    )?;
    Ok(source.with_db_info(section.append_db_info))
}

async fn mongo_source(
    section: &MongoSection,
) -> Result<CollectionSource<MongoClient>, MigrationError> {
    let client = MongoClient::connect(&MongoSettings {
        host: section.host.clone(),
        port: section.port,
        db: section.db.clone(),
        user: section.user.clone(),
        password: section.password.clone(),
        collection: section.collection.clone(),
    })
    .await?;
    Ok(CollectionSource::new(
        client,
        section.pk.clone(),
        section.column.clone(),
    )?)
}

fn file_source(section: &FileSection) -> Result<CsvDataSource, MigrationError> {
    let path = required_path(section.path.as_deref(), "file.path")?;
    let mut chars = section.delimiter.chars();
    let delimiter = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(ConfigError::ValidationFailed(vec![format!(
                "file.delimiter must be a single character, got '{}'",
                section.delimiter
            )])
            .into());
        }
    };
    let settings = CsvSettings {
        delimiter,
        has_header: section.header,
    };
    Ok(CsvDataSource::new(path, settings)?)
}

fn required_path<'a>(path: Option<&'a Path>, name: &str) -> Result<&'a Path, MigrationError> {
    path.ok_or_else(|| ConfigError::ValidationFailed(vec![format!("{name} is required")]).into())
}

pub fn sync_options(sync: &SyncSection) -> SyncOptions {
    SyncOptions {
        page_size: sync.limit,
        scale: sync.scale,
        blocking: sync.block,
        sleep: Duration::from_secs(sync.sleep),
    }
}

pub fn transformer(config: &TaskConfig) -> Result<PageTransformer, MigrationError> {
    Ok(PageTransformer::new(
        config.columns().to_vec(),
        config.appendices()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::file::error::FileError;
    use model::transform::appendix::Appendix;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn options_follow_sync_section() {
        let options = sync_options(&SyncSection {
            limit: 50,
            scale: 2,
            block: false,
            sleep: 3,
        });
        assert_eq!(options.page_size, 50);
        assert_eq!(options.scale, 2);
        assert!(!options.blocking);
        assert_eq!(options.sleep, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn file_reader_builds_csv_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"a\tb\n1\t2\n").unwrap();
        let config = TaskConfig::from_yaml(&format!(
            "reader: file\nfile:\n  path: {}\n  delimiter: \"\\\\t\"\n",
            file.path().display()
        ))
        .unwrap();

        let mut source = create_source(&config).await.unwrap();
        assert_eq!(source.cursor_field(), "line");
        assert_eq!(source.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let config =
            TaskConfig::from_yaml("reader: json\njson:\n  path: /definitely/not/here.jsonl\n")
                .unwrap();
        assert!(matches!(
            create_source(&config).await,
            Err(MigrationError::File(FileError::NotFound(_)))
        ));
    }

    #[test]
    fn transformer_takes_parsed_appendices() {
        let config = TaskConfig::from_yaml(
            "reader: json\njson:\n  path: /tmp/x.jsonl\n  appendices: [\"region:us-east\"]\n",
        )
        .unwrap();
        assert_eq!(
            config.appendices().unwrap(),
            vec![Appendix::field("region", "us-east")]
        );
        assert!(transformer(&config).is_ok());
    }

    #[tokio::test]
    async fn sled_backend_opens_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateConfig {
            backend: StateBackend::Sled,
            path: dir.path().join("state"),
            ..StateConfig::default()
        };
        let stores = open_stores(&state).await.unwrap();
        stores.queue.push("q", &["1".to_string()]).await.unwrap();
        assert_eq!(stores.queue.len("q").await.unwrap(), 1);
    }
}
