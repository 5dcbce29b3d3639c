use crate::sql::base::{dialect::Dialect, error::DbError, offsets::BoundQuery};
use async_trait::async_trait;
use model::records::row::RowData;

/// Capability a relational backend exposes to [`TableSource`]: run a rendered
/// statement and hand back rows, nothing more. Pooling, TLS and wire details
/// stay behind this seam.
///
/// [`TableSource`]: crate::sql::base::source::TableSource
#[async_trait]
pub trait SqlClient: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    /// Database (schema) the client is connected to.
    fn database(&self) -> &str;

    /// Runs `query` and converts each result row into a [`RowData`] owned by `entity`.
    async fn fetch_rows(&self, query: &BoundQuery, entity: &str) -> Result<Vec<RowData>, DbError>;

    /// Runs a single-value `COUNT` statement.
    async fn fetch_count(&self, sql: &str) -> Result<u64, DbError>;

    /// Releases the underlying connections. Further calls fail with [`DbError::Closed`].
    async fn close(&mut self) -> Result<(), DbError>;
}
