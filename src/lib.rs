//! Database connection handle with nested transactions and CRUD helpers.
//!
//! # Intention
//!
//! - Own one driver session per [`Database`] handle and run parameterized
//!   statements through it.
//! - Build INSERT/UPDATE/DELETE statements from field maps, always binding
//!   values instead of quoting them.
//! - Count nested `begin`/`commit` calls over a single physical transaction.
//! - Speak SQLite through rusqlite, and MySQL through the `mysql` client when
//!   the `mysql` feature is enabled.
//!
//! # Architectural Boundaries
//!
//! - Parsing, execution, locking and durability belong to the driver.
//! - No pooling, retries, migrations or object mapping.
//! - Configuration is owned by the application and passed in, usually
//!   through a [`DatabaseRegistry`].

pub mod catalog;
pub mod config;
pub mod database;
pub mod driver;
pub mod error;
#[cfg(feature = "mysql")]
pub mod mysql_driver;
pub mod registry;
pub mod sanitize;
pub mod sqlite;
pub mod transaction;
pub mod value;

pub use catalog::TableField;
pub use config::{Backend, DatabaseConfig};
pub use database::{Database, ResultHandle};
pub use driver::{BoxedDriver, Dialect, Driver, StatementOutput};
pub use error::{DbError, DriverError, Result};
#[cfg(feature = "mysql")]
pub use mysql_driver::MysqlDriver;
pub use registry::DatabaseRegistry;
pub use sanitize::remove_nbsp;
pub use sqlite::{SqliteDriver, MEMORY};
pub use transaction::{Physical, TransactionCounter};
pub use value::{Fields, Row, Value};
