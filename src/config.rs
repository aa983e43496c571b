//! Connection settings supplied by the application.

use serde::{Deserialize, Serialize};

use crate::driver::BoxedDriver;
use crate::error::{DbError, Result};
#[cfg(feature = "mysql")]
use crate::mysql_driver::MysqlDriver;
use crate::sqlite::{SqliteDriver, MEMORY};

/// Backend named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Mysql,
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8".to_string()
}

/// Settings for one logical database.
///
/// `:memory:` as either `host` or `database` selects an embedded database
/// regardless of `backend`. For SQLite, `database` is the file path.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
}

impl DatabaseConfig {
    /// Embedded database that lives as long as its handle.
    pub fn memory() -> Self {
        Self::sqlite(MEMORY)
    }

    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: None,
            port: default_port(),
            database: path.into(),
            user: None,
            password: None,
            charset: default_charset(),
        }
    }

    pub fn mysql(host: &str, database: &str, user: &str, password: &str) -> Self {
        Self {
            backend: Backend::Mysql,
            host: Some(host.to_string()),
            port: default_port(),
            database: database.to_string(),
            user: Some(user.to_string()),
            password: Some(password.to_string()),
            charset: default_charset(),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.database == MEMORY || self.host.as_deref() == Some(MEMORY)
    }

    /// DSN-style description of the target, without credentials.
    pub fn target(&self) -> String {
        if self.is_memory() {
            return format!("sqlite:{}", MEMORY);
        }
        match self.backend {
            Backend::Sqlite => format!("sqlite:{}", self.database),
            Backend::Mysql => format!(
                "mysql:host={};port={};dbname={};charset={}",
                self.host.as_deref().unwrap_or("localhost"),
                self.port,
                self.database,
                self.charset
            ),
        }
    }

    /// Open the session this configuration describes.
    ///
    /// MySQL targets need the `mysql` feature; without it they are a
    /// configuration error.
    pub fn open_driver(&self) -> Result<BoxedDriver> {
        if self.is_memory() {
            return Ok(Box::new(SqliteDriver::open_in_memory()?));
        }
        match self.backend {
            Backend::Sqlite => {
                if self.database.is_empty() {
                    return Err(DbError::config("sqlite database path is empty"));
                }
                Ok(Box::new(SqliteDriver::open(&self.database)?))
            }
            #[cfg(feature = "mysql")]
            Backend::Mysql => Ok(Box::new(MysqlDriver::connect(self)?)),
            #[cfg(not(feature = "mysql"))]
            Backend::Mysql => Err(DbError::config(format!(
                "{} needs the `mysql` feature",
                self.target()
            ))),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("charset", &self.charset)
            .finish()
    }
}
