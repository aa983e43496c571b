//! Named database settings, owned by the application and handed to whoever
//! needs a connection.
//!
//! ```toml
//! [databases.main]
//! database = "/var/lib/app/main.db"
//!
//! [databases.scratch]
//! database = ":memory:"
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseRegistry {
    #[serde(default)]
    databases: BTreeMap<String, DatabaseConfig>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, name: &str, config: DatabaseConfig) -> Self {
        self.register(name, config);
        self
    }

    /// Add or replace the settings stored under `name`.
    pub fn register(&mut self, name: &str, config: DatabaseConfig) {
        debug!(name, target = %config.target(), "registered database");
        self.databases.insert(name.to_string(), config);
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseConfig> {
        self.databases.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| DbError::config(e.to_string()))
    }

    /// Read a registry from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read database config {}", path.display()))?;
        let registry = Self::from_toml_str(&source)
            .with_context(|| format!("Failed to parse database config {}", path.display()))?;
        Ok(registry)
    }

    /// Open a new handle for the database registered as `name`.
    pub fn open(&self, name: &str) -> Result<Database> {
        let config = self
            .get(name)
            .ok_or_else(|| DbError::config(format!("no database registered as '{}'", name)))?;
        Database::connect(name, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [databases.scratch]
        database = ":memory:"

        [databases.legacy]
        backend = "mysql"
        host = "10.0.0.5"
        database = "legacy"
        user = "robot"
        charset = "utf8mb4"
    "#;

    #[test]
    fn test_parse_and_lookup() {
        let registry = DatabaseRegistry::from_toml_str(SAMPLE).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["legacy", "scratch"]);
        let legacy = registry.get("legacy").unwrap();
        assert_eq!(legacy.charset, "utf8mb4");
        assert_eq!(legacy.port, 3306);
    }

    #[test]
    fn test_open_unknown_name() {
        let registry = DatabaseRegistry::new();
        assert!(matches!(registry.open("nope"), Err(DbError::Config(_))));
    }

    #[test]
    fn test_open_gives_independent_handles() {
        let registry = DatabaseRegistry::from_toml_str(SAMPLE).unwrap();
        let mut a = registry.open("scratch").unwrap();
        let mut b = registry.open("scratch").unwrap();
        a.execute("CREATE TABLE only_in_a (id INTEGER)", &[]).unwrap();
        assert!(a.table_exists("only_in_a").unwrap());
        assert!(!b.table_exists("only_in_a").unwrap());
        assert_eq!(a.name(), "scratch");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = DatabaseRegistry::from_toml_str("[databases.x]\nport = 1").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }
}
