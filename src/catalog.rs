//! Schema lookups: column definitions, CREATE statements, table status and
//! integrity checks, answered from each dialect's own catalog.

use crate::database::Database;
use crate::driver::{Dialect, Driver};
use crate::error::{DbError, Result};
use crate::value::{Row, Value};

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableField {
    pub name: String,
    /// Declared type, verbatim. SQLite allows it to be empty.
    pub data_type: String,
    pub nullable: bool,
    /// Default expression as the catalog stores it; `None` when there is none.
    pub default: Option<String>,
    pub primary_key: bool,
}

fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(Value::to_text)
}

fn required(row: &Row, column: &str, sql: &str) -> Result<String> {
    text(row, column)
        .ok_or_else(|| DbError::driver(sql, format!("catalog row without a '{}' column", column)))
}

impl<D: Driver> Database<D> {
    /// `"schema".` prefix (quoted) and the bare table name.
    fn split_table<'a>(&self, table: &'a str) -> Result<(String, &'a str)> {
        self.quote_ident(table)?;
        Ok(match table.split_once('.') {
            Some((schema, name)) => (format!("{}.", self.quote_ident(schema)?), name),
            None => (String::new(), table),
        })
    }

    fn query_rows(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let handle = self.execute(sql, params)?;
        self.fetch_all(handle)
    }

    /// Column definitions of `table`, in declaration order.
    ///
    /// A table the catalog does not know is a logic error.
    pub fn table_fields(&mut self, table: &str) -> Result<Vec<TableField>> {
        let (sql, rows) = match self.dialect() {
            Dialect::Sqlite => {
                let (schema, name) = self.split_table(table)?;
                let sql = format!("PRAGMA {}table_info({})", schema, self.quote_ident(name)?);
                let rows = self.query_rows(&sql, &[])?;
                (sql, rows)
            }
            Dialect::Mysql => {
                let sql = format!("SHOW FULL FIELDS FROM {}", self.quote_ident(table)?);
                let rows = self.query_rows(&sql, &[])?;
                (sql, rows)
            }
        };
        if rows.is_empty() {
            return Err(DbError::logic(format!("table '{}' has no columns", table)));
        }

        let mut fields = Vec::with_capacity(rows.len());
        for row in &rows {
            let field = match self.dialect() {
                Dialect::Sqlite => TableField {
                    name: required(row, "name", &sql)?,
                    data_type: text(row, "type").unwrap_or_default(),
                    nullable: row.get_i64("notnull") == Some(0),
                    default: text(row, "dflt_value"),
                    primary_key: row.get_i64("pk").is_some_and(|pk| pk > 0),
                },
                Dialect::Mysql => TableField {
                    name: required(row, "Field", &sql)?,
                    data_type: text(row, "Type").unwrap_or_default(),
                    nullable: text(row, "Null").as_deref() == Some("YES"),
                    default: text(row, "Default"),
                    primary_key: text(row, "Key").as_deref() == Some("PRI"),
                },
            };
            fields.push(field);
        }
        Ok(fields)
    }

    /// The statement that recreates `table`, or `None` if there is no such
    /// table. MySQL output quotes identifiers with backticks.
    pub fn create_table_sql(&mut self, table: &str) -> Result<Option<String>> {
        match self.dialect() {
            Dialect::Sqlite => {
                let (schema, name) = self.split_table(table)?;
                let sql = format!(
                    "SELECT sql FROM {}sqlite_master WHERE type = 'table' AND name = ?",
                    schema
                );
                let rows = self.query_rows(&sql, &[Value::from(name)])?;
                Ok(rows.first().and_then(|row| text(row, "sql")))
            }
            Dialect::Mysql => {
                let quoted = self.quote_ident(table)?;
                self.execute("SET SQL_QUOTE_SHOW_CREATE = 1", &[])?;
                let rows = self.query_rows(&format!("SHOW CREATE TABLE {}", quoted), &[])?;
                Ok(rows.first().and_then(|row| text(row, "Create Table")))
            }
        }
    }

    /// Catalog rows for every table whose name matches the `LIKE` pattern.
    ///
    /// Columns are whatever the dialect's catalog carries: `sqlite_master`
    /// for SQLite, `information_schema.tables` for MySQL.
    pub fn table_status(&mut self, pattern: &str) -> Result<Vec<Row>> {
        let sql = self.dialect().table_status_sql();
        self.query_rows(sql, &[Value::from(pattern)])
    }

    /// Whether the server knows a database (SQLite: an attached schema)
    /// named `name`.
    pub fn database_exists(&mut self, name: &str) -> Result<bool> {
        match self.dialect() {
            Dialect::Sqlite => {
                let rows = self.query_rows("PRAGMA database_list", &[])?;
                Ok(rows
                    .iter()
                    .any(|row| text(row, "name").as_deref() == Some(name)))
            }
            Dialect::Mysql => {
                let rows = self.query_rows(
                    "SELECT schema_name FROM information_schema.schemata WHERE schema_name = ?",
                    &[Value::from(name)],
                )?;
                Ok(!rows.is_empty())
            }
        }
    }

    /// Run the backend's consistency check on `table`. A missing table
    /// counts as failing the check.
    pub fn check_table(&mut self, table: &str) -> Result<bool> {
        match self.dialect() {
            Dialect::Sqlite => {
                if self.create_table_sql(table)?.is_none() {
                    return Ok(false);
                }
                let (schema, name) = self.split_table(table)?;
                let sql = format!("PRAGMA {}integrity_check({})", schema, self.quote_ident(name)?);
                let rows = self.query_rows(&sql, &[])?;
                Ok(rows.len() == 1
                    && rows[0].iter().next().is_some_and(|(_, v)| v.as_str() == Some("ok")))
            }
            Dialect::Mysql => {
                let sql = format!("CHECK TABLE {}", self.quote_ident(table)?);
                let rows = self.query_rows(&sql, &[])?;
                Ok(rows.iter().any(|row| {
                    text(row, "Msg_text").is_some_and(|msg| msg.eq_ignore_ascii_case("ok"))
                }))
            }
        }
    }
}
