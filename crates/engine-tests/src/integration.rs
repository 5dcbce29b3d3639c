#[cfg(test)]
mod tests {
    use crate::utils::{
        CACHE_KEY, FakeCollection, FakeTable, QUEUE_KEY, RecordingCheckpoints, RecordingQueue,
        engine, file_task, oid, options, people_csv, queued_ids, queued_json, temp_file,
    };
    use connectors::{
        document::source::{CollectionSource, DEFAULT_ID_FIELD},
        file::{
            csv::source::{CsvDataSource, CsvSettings},
            jsonl::source::JsonLinesSource,
        },
        source::DataSource,
        sql::base::source::TableSource,
    };
    use engine_core::{
        progress::ProgressStage,
        queue::OutputQueue,
        state::{CheckpointStore, memory::MemoryStore, sled_store::SledStore},
    };
    use engine_processing::{engine::SyncOptions, transform::PageTransformer};
    use engine_runtime::execution::{executor, factory::TaskStores};
    use model::transform::appendix::Appendix;
    use serde_json::json;
    use std::{sync::Arc, time::Duration};
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn two_row_csv_pushes_one_record_per_page() {
        let file = temp_file("name,age\nAlice,30\nBob,40\n");
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(RecordingQueue::new(store.clone()));
        let checkpoints = Arc::new(RecordingCheckpoints::new(store.clone()));

        let source = CsvDataSource::new(file.path(), CsvSettings::default()).unwrap();
        let mut engine = engine(
            Box::new(source),
            checkpoints.clone(),
            queue.clone(),
            options(1),
            PageTransformer::default(),
        );
        let report = engine.sync().await.unwrap();

        assert_eq!(
            queue.pushes(),
            vec![
                vec![r#"{"name":"Alice","age":"30"}"#.to_string()],
                vec![r#"{"name":"Bob","age":"40"}"#.to_string()],
            ]
        );
        assert_eq!(report.total, 2);

        let last = checkpoints.writes().pop().unwrap();
        assert_eq!(last["count"], json!(2));
        assert_eq!(last["page"], json!(2));
        assert_eq!(last["line"], json!(2));
        assert_eq!(last["record"], json!({"name": "Bob", "age": "40"}));

        assert!(!store.exists(CACHE_KEY).await.unwrap());
        assert!(logs_contain("Starting task it"));
    }

    #[traced_test]
    #[tokio::test]
    async fn every_source_pushes_its_total() {
        for page_size in [1, 3, 4, 100] {
            let csv = people_csv(10);
            let jsonl = temp_file(
                &(1..=10)
                    .map(|i| format!("{{\"id\":{i}}}\n"))
                    .collect::<String>(),
            );
            let sources: Vec<Box<dyn DataSource>> = vec![
                Box::new(CsvDataSource::new(csv.path(), CsvSettings::default()).unwrap()),
                Box::new(JsonLinesSource::new(jsonl.path()).unwrap()),
                Box::new(
                    TableSource::new(FakeTable::with_ids(1..=10), "users", "id", vec![]).unwrap(),
                ),
                Box::new(
                    CollectionSource::new(FakeCollection::with_docs(10), DEFAULT_ID_FIELD, vec![])
                        .unwrap(),
                ),
            ];

            for source in sources {
                let name = source.describe();
                let store = Arc::new(MemoryStore::new());
                let queue = Arc::new(RecordingQueue::new(store.clone()));
                let mut engine = engine(
                    source,
                    store.clone(),
                    queue.clone(),
                    options(page_size),
                    PageTransformer::default(),
                );
                let report = engine.sync().await.unwrap();

                let pushed: usize = queue.pushes().iter().map(Vec::len).sum();
                assert_eq!(pushed, 10, "{name} with page size {page_size}");
                assert_eq!(report.metrics.records_pushed, 10);
                assert_eq!(queued_ids(queue.as_ref()).await, (1..=10).collect::<Vec<_>>());
                assert!(!store.exists(CACHE_KEY).await.unwrap());
            }
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn table_projection_db_info_and_appendix() {
        let table = FakeTable::with_ids([5, 8]);
        let closed = table.closed.clone();
        let source = TableSource::new(table, "users", "id", vec!["name".into()])
            .unwrap()
            .with_db_info(true);
        let store = Arc::new(MemoryStore::new());
        let transformer = PageTransformer::new(
            vec!["name".into()],
            vec![Appendix::field("region", "us-east")],
        );
        let mut engine = engine(
            Box::new(source),
            store.clone(),
            store.clone(),
            options(10),
            transformer,
        );
        engine.sync().await.unwrap();

        let items = store.range(QUEUE_KEY, 0, -1).await.unwrap();
        assert_eq!(
            items[0],
            r#"{"name":"user5","conveyor_db":"shop","conveyor_table":"users","region":"us-east"}"#
        );
        assert_eq!(items.len(), 2);
        assert!(*closed.lock().unwrap());
    }

    #[traced_test]
    #[tokio::test]
    async fn collection_cursor_is_the_last_object_id() {
        let store = Arc::new(MemoryStore::new());
        let checkpoints = Arc::new(RecordingCheckpoints::new(store.clone()));
        let source =
            CollectionSource::new(FakeCollection::with_docs(5), DEFAULT_ID_FIELD, vec![]).unwrap();
        let mut engine = engine(
            Box::new(source),
            checkpoints.clone(),
            store.clone(),
            options(2),
            PageTransformer::default(),
        );
        engine.sync().await.unwrap();

        let cursors: Vec<_> = checkpoints
            .writes()
            .iter()
            .map(|write| write["_id"].clone())
            .collect();
        assert_eq!(cursors, vec![oid(2), oid(4), oid(5)]);
    }

    #[traced_test]
    #[tokio::test]
    async fn headerless_lines_get_raw_appendix() {
        let file = temp_file("x,y\nz,w\n");
        let config = file_task(file.path(), 10, "  header: false\n  appendices: [tag1]\n");
        let store = Arc::new(MemoryStore::new());

        executor::sync_with(&config, TaskStores::shared(store.clone()))
            .await
            .unwrap();
        assert_eq!(
            queued_json(store.as_ref()).await,
            vec![json!("x,y,tag1"), json!("z,w,tag1")]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn blocking_keeps_queue_near_its_limit() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(RecordingQueue::new(store.clone()));
        let source = TableSource::new(FakeTable::with_ids(1..=20), "users", "id", vec![]).unwrap();
        let options = SyncOptions {
            page_size: 2,
            scale: 2,
            blocking: true,
            sleep: Duration::from_millis(2),
        };
        let mut engine = engine(
            Box::new(source),
            store.clone(),
            queue.clone(),
            options,
            PageTransformer::default(),
        );

        let consumer = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut consumed = Vec::new();
                while consumed.len() < 20 {
                    match store.pop(QUEUE_KEY).await.unwrap() {
                        Some(item) => consumed.push(item),
                        None => tokio::time::sleep(Duration::from_millis(1)).await,
                    }
                    tokio::time::sleep(Duration::from_millis(3)).await;
                }
                consumed
            })
        };

        let report = engine.sync().await.unwrap();
        let consumed = consumer.await.unwrap();

        assert_eq!(consumed.len(), 20);
        assert!(report.metrics.backpressure_waits > 0);
        assert!(queue.max_len.load(std::sync::atomic::Ordering::SeqCst) <= 4 + 2);
        assert!(logs_contain("queue is full, waiting"));
    }

    #[traced_test]
    #[tokio::test]
    async fn runtime_on_sled_reports_idle_after_sync() {
        let dir = tempfile::tempdir().unwrap();
        let file = people_csv(7);
        let config = file_task(file.path(), 3, "");
        let stores = TaskStores::shared(Arc::new(SledStore::open(dir.path()).unwrap()));

        let report = executor::sync_with(&config, stores.clone()).await.unwrap();
        assert_eq!(report.pages, 3);

        let status = executor::status_with(&config, stores.clone()).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Idle);
        assert_eq!(status.queued, 3);
        assert_eq!(stores.queue.pop_many(QUEUE_KEY, 10).await.unwrap().len(), 3);
    }
}
