use crate::{
    error::AdapterError,
    source::DataSource,
    sql::base::{client::SqlClient, offsets::PkOffset},
};
use async_trait::async_trait;
use model::{
    pagination::{
        cursor::{Cursor, CursorKind},
        page::FetchResult,
    },
    records::record::Record,
    transform::appendix::Appendix,
};
use std::time::Instant;
use tracing::{debug, info};

pub const DB_INFO_DATABASE_FIELD: &str = "conveyor_db";
pub const DB_INFO_TABLE_FIELD: &str = "conveyor_table";

/// A relational table paged by ascending primary key.
pub struct TableSource<C: SqlClient> {
    client: C,
    table: String,
    offset: PkOffset,
    /// Projection pushed down into the select list; empty selects `*`.
    columns: Vec<String>,
    /// Tag every record with the database and table it came from.
    append_db_info: bool,
}

impl<C: SqlClient> TableSource<C> {
    /// Fails when no primary key is configured: key-range paging is impossible
    /// without one.
    pub fn new(
        client: C,
        table: impl Into<String>,
        pk: impl Into<String>,
        columns: Vec<String>,
    ) -> Result<Self, AdapterError> {
        let pk = pk.into();
        if pk.trim().is_empty() {
            return Err(AdapterError::MissingProperty("pk".into()));
        }
        Ok(TableSource {
            client,
            table: table.into(),
            offset: PkOffset::new(pk),
            columns,
            append_db_info: false,
        })
    }

    pub fn with_db_info(mut self, append_db_info: bool) -> Self {
        self.append_db_info = append_db_info;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: SqlClient> DataSource for TableSource<C> {
    fn describe(&self) -> String {
        format!("{}.{}", self.client.database(), self.table)
    }

    fn cursor_kind(&self) -> CursorKind {
        CursorKind::Key
    }

    fn cursor_field(&self) -> &str {
        &self.offset.pk
    }

    async fn count(&mut self) -> Result<u64, AdapterError> {
        let sql = self.offset.count_query(self.client.dialect(), &self.table);
        let total = self.client.fetch_count(&sql).await?;
        info!(source = %self.describe(), total, "counted rows");
        Ok(total)
    }

    async fn next_page(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<FetchResult, AdapterError> {
        let start = Instant::now();
        let query = self.offset.page_query(
            self.client.dialect(),
            &self.table,
            &self.columns,
            cursor,
            page_size,
        )?;
        debug!(sql = %query.sql, params = ?query.params, "fetching page");

        let rows = self.client.fetch_rows(&query, &self.table).await?;
        let next_cursor = match rows.last() {
            Some(row) => self.offset.next_cursor(row)?,
            None => Cursor::None,
        };
        let records = rows.into_iter().map(Record::Row).collect();

        Ok(FetchResult::new(
            records,
            next_cursor,
            page_size,
            start.elapsed().as_millis(),
        ))
    }

    fn decorate(&self, mut records: Vec<Record>, appendices: &[Appendix]) -> Vec<Record> {
        let mut all = Vec::with_capacity(appendices.len() + 2);
        if self.append_db_info {
            all.push(Appendix::field(DB_INFO_DATABASE_FIELD, self.client.database()));
            all.push(Appendix::field(DB_INFO_TABLE_FIELD, self.table.clone()));
        }
        all.extend_from_slice(appendices);

        for record in records.iter_mut() {
            for appendix in &all {
                record.append(appendix, ',');
            }
        }
        records
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.client.close().await?;
        info!(source = %self.describe(), "connection released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::{
        dialect::{Dialect, MySql},
        error::DbError,
        offsets::BoundQuery,
    };
    use model::{
        core::value::{FieldValue, Value},
        records::row::RowData,
    };
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `rows` ordered by `id`, honouring `id > ?` and `LIMIT`.
    struct ScriptedClient {
        rows: Vec<(i64, &'static str)>,
        statements: Mutex<Vec<BoundQuery>>,
        closed: bool,
    }

    impl ScriptedClient {
        fn new(rows: Vec<(i64, &'static str)>) -> Self {
            ScriptedClient {
                rows,
                statements: Mutex::new(Vec::new()),
                closed: false,
            }
        }
    }

    #[async_trait]
    impl SqlClient for ScriptedClient {
        fn dialect(&self) -> &dyn Dialect {
            &MySql
        }

        fn database(&self) -> &str {
            "shop"
        }

        async fn fetch_rows(
            &self,
            query: &BoundQuery,
            entity: &str,
        ) -> Result<Vec<RowData>, DbError> {
            if self.closed {
                return Err(DbError::Closed("shop".into()));
            }
            self.statements.lock().unwrap().push(query.clone());
            let after = query.params.first().and_then(Value::as_u64).unwrap_or(0) as i64;
            let limit: usize = query.sql.rsplit(' ').next().unwrap().parse().unwrap();
            Ok(self
                .rows
                .iter()
                .filter(|(id, _)| *id > after)
                .take(limit)
                .map(|(id, name)| {
                    RowData::new(
                        entity,
                        vec![
                            FieldValue::new("id", Value::Int(*id)),
                            FieldValue::new("name", Value::from(*name)),
                        ],
                    )
                })
                .collect())
        }

        async fn fetch_count(&self, _sql: &str) -> Result<u64, DbError> {
            Ok(self.rows.len() as u64)
        }

        async fn close(&mut self) -> Result<(), DbError> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn requires_primary_key() {
        let err = TableSource::new(ScriptedClient::new(vec![]), "orders", "", vec![]);
        assert!(matches!(err, Err(AdapterError::MissingProperty(_))));
    }

    #[tokio::test]
    async fn pages_by_key_range() {
        let client = ScriptedClient::new(vec![(3, "a"), (9, "b"), (12, "c")]);
        let mut source = TableSource::new(client, "orders", "id", vec![]).unwrap();
        assert_eq!(source.count().await.unwrap(), 3);
        assert_eq!(source.describe(), "shop.orders");

        let page = source.next_page(&Cursor::None, 2).await.unwrap();
        assert_eq!(page.row_count, 2);
        assert_eq!(page.next_cursor, Cursor::key("id", Value::Int(9)));
        assert!(!page.reached_end);

        let page = source.next_page(&page.next_cursor, 2).await.unwrap();
        assert_eq!(page.records[0].to_json(), json!({"id": 12, "name": "c"}));
        assert!(page.reached_end);

        let page = source.next_page(&page.next_cursor, 2).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, Cursor::None);

        let statements = source.client().statements.lock().unwrap();
        assert!(statements[1].sql.contains("WHERE `id` > ?"));
        assert_eq!(statements[1].params, vec![Value::Int(9)]);
    }

    #[tokio::test]
    async fn projection_drops_key_added_for_paging() {
        let client = ScriptedClient::new(vec![(1, "a")]);
        let mut source =
            TableSource::new(client, "orders", "id", vec!["name".to_string()]).unwrap();
        let page = source.next_page(&Cursor::None, 10).await.unwrap();
        assert_eq!(page.next_cursor, Cursor::key("id", Value::Int(1)));

        let records = source.project(page.records, &["name".to_string()]);
        assert_eq!(records[0].to_json(), json!({"name": "a"}));
    }

    #[tokio::test]
    async fn db_info_comes_before_appendices() {
        let client = ScriptedClient::new(vec![(1, "a")]);
        let mut source = TableSource::new(client, "orders", "id", vec![])
            .unwrap()
            .with_db_info(true);
        let page = source.next_page(&Cursor::None, 10).await.unwrap();
        let records = source.decorate(page.records, &[Appendix::field("region", "us-east")]);
        assert_eq!(
            records[0].to_queue_item().unwrap(),
            r#"{"id":1,"name":"a","conveyor_db":"shop","conveyor_table":"orders","region":"us-east"}"#
        );
    }

    #[tokio::test]
    async fn close_releases_client() {
        let client = ScriptedClient::new(vec![(1, "a")]);
        let mut source = TableSource::new(client, "orders", "id", vec![]).unwrap();
        source.close().await.unwrap();
        assert!(source.next_page(&Cursor::None, 1).await.is_err());
    }
}
