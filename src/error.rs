//! Error types for database handles.
//!
//! Two families matter to callers: failures coming back from the driver,
//! which always carry the SQL text that produced them, and logic errors
//! detected locally (transaction depth misuse, stale result handles, bad
//! identifiers). Neither is retried.

use thiserror::Error;

/// Boxed error returned across the [`Driver`](crate::driver::Driver) boundary.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    /// The driver rejected or failed to run a statement.
    #[error("SQL error: {sql}: {source}")]
    Driver {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// Misuse detected by the handle itself.
    #[error("Logic error: {0}")]
    Logic(String),

    /// The underlying session could not be opened.
    #[error("Database connection failed ({target}): {source}")]
    Connect {
        target: String,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn driver(sql: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Driver {
            sql: sql.into(),
            source: source.into(),
        }
    }

    pub fn logic(reason: impl Into<String>) -> Self {
        Self::Logic(reason.into())
    }

    pub fn connect(target: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Connect {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// SQL text attached to a driver error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            DbError::Driver { sql, .. } => Some(sql),
            _ => None,
        }
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, DbError::Logic(_))
    }
}
