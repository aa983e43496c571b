use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use tracing::info;

use crate::driver::{Dialect, Driver, StatementOutput};
use crate::error::{DbError, DriverError, Result};
use crate::value::Value;

/// Location string that selects an embedded, file-less database.
pub const MEMORY: &str = ":memory:";

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Boolean(b) => ToSqlOutput::from(*b),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(value_from_ref(value))
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => Value::Text(s.to_owned()),
            Err(_) => Value::Blob(t.to_vec()),
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// [`Driver`] backed by a rusqlite connection, either file-based or in memory.
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open `location`, which is a file path or [`MEMORY`].
    pub fn open(location: &str) -> Result<Self> {
        if location == MEMORY {
            return Self::open_in_memory();
        }
        Self::open_path(location)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| DbError::connect(path.display().to_string(), e))?;
        info!(path = %path.display(), "opened sqlite database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::connect(MEMORY, e))?;
        info!("opened in-memory sqlite database");
        Ok(Self { conn })
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> std::result::Result<StatementOutput, DriverError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        if columns.is_empty() {
            let affected = stmt.execute(params_from_iter(params.iter()))?;
            return Ok(StatementOutput::affected(affected as u64));
        }

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(value_from_ref(row.get_ref(idx)?));
            }
            collected.push(values);
        }

        Ok(StatementOutput {
            columns,
            rows: collected,
            rows_affected: 0,
        })
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}
