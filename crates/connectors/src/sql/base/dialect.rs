//! Database-specific SQL syntax used by the key-range pager.

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (table or column name) in the dialect's quotes.
    ///
    /// - MySQL uses backticks: `` `my_column` ``
    /// - PostgreSQL uses double quotes: `"my_column"`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the `index`-th (0-based) bound parameter.
    fn get_placeholder(&self, index: usize) -> String;

    /// Returns the name of the dialect (e.g. "MySQL").
    fn name(&self) -> String;

    /// Quotes a possibly schema-qualified name part by part, so `shop.orders`
    /// becomes `` `shop`.`orders` ``.
    fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn name(&self) -> String {
        "MySQL".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_quoting() {
        assert_eq!(MySql.quote_identifier("id"), "`id`");
        assert_eq!(MySql.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(MySql.quote_qualified("shop.orders"), "`shop`.`orders`");
    }
}
