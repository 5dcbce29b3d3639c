use crate::sql::base::{dialect::Dialect, error::DbError};
use model::{core::value::Value, pagination::cursor::Cursor, records::row::RowData};

/// A rendered statement plus the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Key-range pagination over a single primary key:
/// `WHERE pk > ? ORDER BY pk ASC LIMIT n`.
#[derive(Debug, Clone)]
pub struct PkOffset {
    pub pk: String,
}

impl PkOffset {
    pub fn new(pk: impl Into<String>) -> Self {
        PkOffset { pk: pk.into() }
    }

    /// The select list: every column when no projection is configured,
    /// otherwise the projection plus the key so the next cursor can be read.
    fn select_list(&self, dialect: &dyn Dialect, columns: &[String]) -> String {
        if columns.is_empty() {
            return "*".to_string();
        }
        let mut fields: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
        if !columns.iter().any(|c| c == &self.pk) {
            fields.push(dialect.quote_identifier(&self.pk));
        }
        fields.join(", ")
    }

    pub fn page_query(
        &self,
        dialect: &dyn Dialect,
        table: &str,
        columns: &[String],
        cursor: &Cursor,
        limit: usize,
    ) -> Result<BoundQuery, DbError> {
        let pk = dialect.quote_identifier(&self.pk);
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_list(dialect, columns),
            dialect.quote_qualified(table)
        );

        let mut params = Vec::new();
        match cursor {
            Cursor::None => {}
            Cursor::Key { value, .. } => {
                sql.push_str(&format!(" WHERE {pk} > {}", dialect.get_placeholder(0)));
                params.push(value.clone());
            }
            other => return Err(DbError::InvalidCursor(format!("{other:?}"))),
        }

        sql.push_str(&format!(" ORDER BY {pk} ASC LIMIT {limit}"));
        Ok(BoundQuery { sql, params })
    }

    pub fn count_query(&self, dialect: &dyn Dialect, table: &str) -> String {
        format!(
            "SELECT COUNT({}) AS total FROM {}",
            dialect.quote_identifier(&self.pk),
            dialect.quote_qualified(table)
        )
    }

    /// Cursor pointing at `row`, the last row of a page.
    pub fn next_cursor(&self, row: &RowData) -> Result<Cursor, DbError> {
        match row.get(&self.pk) {
            Some(field) if !field.value.is_null() => {
                Ok(Cursor::key(self.pk.clone(), field.value.clone()))
            }
            _ => Err(DbError::MissingKey(self.pk.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::dialect::MySql;
    use model::core::value::FieldValue;

    #[test]
    fn first_page_has_no_range() {
        let q = PkOffset::new("id")
            .page_query(&MySql, "orders", &[], &Cursor::None, 100)
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `orders` ORDER BY `id` ASC LIMIT 100");
        assert!(q.params.is_empty());
    }

    #[test]
    fn resumes_after_key_with_projection() {
        let q = PkOffset::new("id")
            .page_query(
                &MySql,
                "shop.orders",
                &["name".to_string()],
                &Cursor::key("id", Value::Int(1200)),
                50,
            )
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT `name`, `id` FROM `shop`.`orders` WHERE `id` > ? ORDER BY `id` ASC LIMIT 50"
        );
        assert_eq!(q.params, vec![Value::Int(1200)]);
    }

    #[test]
    fn count_by_key() {
        assert_eq!(
            PkOffset::new("id").count_query(&MySql, "orders"),
            "SELECT COUNT(`id`) AS total FROM `orders`"
        );
    }

    #[test]
    fn next_cursor_needs_key() {
        let offset = PkOffset::new("id");
        let row = RowData::new("orders", vec![FieldValue::new("id", Value::Int(7))]);
        assert_eq!(offset.next_cursor(&row).unwrap(), Cursor::key("id", Value::Int(7)));

        let row = RowData::new("orders", vec![FieldValue::new("name", Value::from("x"))]);
        assert!(matches!(offset.next_cursor(&row), Err(DbError::MissingKey(_))));
    }

    #[test]
    fn line_cursor_is_rejected() {
        let err = PkOffset::new("id").page_query(&MySql, "t", &[], &Cursor::Line { line: 3 }, 1);
        assert!(matches!(err, Err(DbError::InvalidCursor(_))));
    }
}
