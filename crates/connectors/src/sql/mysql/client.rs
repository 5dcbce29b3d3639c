use crate::{
    error::ConnectorError,
    sql::{
        base::{
            client::SqlClient,
            dialect::{self, Dialect},
            error::DbError,
            offsets::BoundQuery,
        },
        mysql::params::MySqlParamStore,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use mysql_async::{
    Column, OptsBuilder, Pool, Row, Value as MySqlValue,
    consts::{ColumnFlags, ColumnType},
    prelude::*,
};
use tracing::{debug, info};

/// Character set number MySQL reports for binary columns.
const BINARY_CHARSET: u16 = 63;

#[derive(Debug, Clone, Default)]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
}

pub struct MySqlClient {
    pool: Option<Pool>,
    db: String,
    dialect: dialect::MySql,
}

impl MySqlClient {
    /// Builds the pool and checks out one connection so an unreachable
    /// server is reported before any paging starts.
    pub async fn connect(settings: &MySqlSettings) -> Result<Self, ConnectorError> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(settings.host.clone())
            .tcp_port(settings.port)
            .user(Some(settings.user.clone()))
            .pass(Some(settings.password.clone()))
            .db_name(Some(settings.db.clone()));
        let pool = Pool::new(opts);
        let conn = pool.get_conn().await?;
        drop(conn);
        info!("Connected to MySQL {}:{}/{}", settings.host, settings.port, settings.db);

        Ok(MySqlClient {
            pool: Some(pool),
            db: settings.db.clone(),
            dialect: dialect::MySql,
        })
    }

    fn pool(&self) -> Result<&Pool, DbError> {
        self.pool.as_ref().ok_or_else(|| DbError::Closed(self.db.clone()))
    }
}

#[async_trait]
impl SqlClient for MySqlClient {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn database(&self) -> &str {
        &self.db
    }

    async fn fetch_rows(&self, query: &BoundQuery, entity: &str) -> Result<Vec<RowData>, DbError> {
        let mut conn = self.pool()?.get_conn().await?;
        let params = MySqlParamStore::from_values(&query.params).params();
        let rows: Vec<Row> = conn.exec(query.sql.as_str(), params).await?;
        debug!(rows = rows.len(), "fetched rows from {}", entity);
        Ok(rows.iter().map(|row| row_data(row, entity)).collect())
    }

    async fn fetch_count(&self, sql: &str) -> Result<u64, DbError> {
        let mut conn = self.pool()?.get_conn().await?;
        let total: Option<u64> = conn.query_first(sql).await?;
        total.ok_or_else(|| DbError::MissingTotal(sql.to_string()))
    }

    async fn close(&mut self) -> Result<(), DbError> {
        if let Some(pool) = self.pool.take() {
            pool.disconnect().await?;
            info!("Disconnected from MySQL database {}", self.db);
        }
        Ok(())
    }
}

fn row_data(row: &Row, entity: &str) -> RowData {
    let fields = row
        .columns_ref()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = row
                .as_ref(idx)
                .map(|raw| convert_value(column, raw))
                .unwrap_or(Value::Null);
            FieldValue::new(column.name_str().into_owned(), value)
        })
        .collect();
    RowData::new(entity, fields)
}

/// Maps a binary-protocol value onto the record value model, using the
/// column definition to tell text, binary, JSON and date columns apart.
fn convert_value(column: &Column, raw: &MySqlValue) -> Value {
    match raw {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(i) => Value::Int(*i),
        MySqlValue::UInt(u) => Value::Uint(*u),
        MySqlValue::Float(f) => Value::Float(f64::from(*f)),
        MySqlValue::Double(d) => Value::Float(*d),
        MySqlValue::Date(y, m, d, h, mi, s, us) => {
            let Some(date) = NaiveDate::from_ymd_opt(i32::from(*y), u32::from(*m), u32::from(*d))
            else {
                // zero dates (0000-00-00) have no calendar representation
                return Value::Null;
            };
            if column.column_type() == ColumnType::MYSQL_TYPE_DATE {
                Value::Date(date)
            } else {
                date.and_hms_micro_opt(u32::from(*h), u32::from(*mi), u32::from(*s), *us)
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null)
            }
        }
        MySqlValue::Time(neg, days, h, m, s, us) => {
            let hours = u32::from(*h) + days * 24;
            let sign = if *neg { "-" } else { "" };
            let time = if *us == 0 {
                format!("{sign}{hours:02}:{m:02}:{s:02}")
            } else {
                format!("{sign}{hours:02}:{m:02}:{s:02}.{us:06}")
            };
            Value::String(time)
        }
        MySqlValue::Bytes(bytes) => {
            if column.column_type() == ColumnType::MYSQL_TYPE_JSON {
                return serde_json::from_slice(bytes)
                    .map(Value::Json)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()));
            }
            let binary = column.character_set() == BINARY_CHARSET
                && column.flags().contains(ColumnFlags::BINARY_FLAG)
                && !is_numeric_text(column.column_type());
            if binary {
                Value::Bytes(bytes.clone())
            } else {
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// DECIMAL values travel as text even over the binary protocol.
fn is_numeric_text(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL
    )
}
