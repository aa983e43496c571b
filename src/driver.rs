//! The seam between a [`Database`](crate::Database) handle and the client
//! library that actually talks to the backend.

use crate::error::DriverError;
use crate::value::Value;

/// SQL flavour spoken by a driver. Decides identifier quoting and the catalog
/// used for table lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
}

impl Dialect {
    pub fn quote_char(&self) -> char {
        match self {
            Dialect::Sqlite => '"',
            Dialect::Mysql => '`',
        }
    }

    /// Query listing table names matching a bound `LIKE` pattern, with `\`
    /// as the escape character.
    pub fn table_lookup_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ? ESCAPE '\\'"
            }
            Dialect::Mysql => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name LIKE ?"
            }
        }
    }

    /// Query listing catalog rows for tables matching a bound `LIKE` pattern.
    pub fn table_status_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "SELECT * FROM sqlite_master WHERE type = 'table' AND name LIKE ?",
            Dialect::Mysql => {
                "SELECT * FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name LIKE ?"
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
        }
    }
}

/// Everything a single statement produced, materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
}

impl StatementOutput {
    /// Output of a statement that returned no result set.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Number of rows for the caller: rows returned by a query, otherwise
    /// rows touched by a DML statement.
    pub fn row_count(&self) -> u64 {
        if self.columns.is_empty() {
            self.rows_affected
        } else {
            self.rows.len() as u64
        }
    }
}

/// A relational client session.
///
/// Implementations prepare `sql`, bind `params` positionally to its `?`
/// placeholders, execute it and collect any rows. They are used from one
/// thread at a time.
pub trait Driver {
    fn dialect(&self) -> Dialect;

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementOutput, DriverError>;

    /// Row id generated by the most recent successful INSERT on this session.
    fn last_insert_id(&self) -> i64;
}

/// Driver chosen at runtime from configuration.
pub type BoxedDriver = Box<dyn Driver + Send>;

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementOutput, DriverError> {
        (**self).execute(sql, params)
    }

    fn last_insert_id(&self) -> i64 {
        (**self).last_insert_id()
    }
}
