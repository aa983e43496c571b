//! The connection handle.

use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::driver::{BoxedDriver, Dialect, Driver, StatementOutput};
use crate::error::{DbError, Result};
use crate::sanitize::{escape_like, is_valid_charset, is_valid_identifier, remove_nbsp};
use crate::sqlite::SqliteDriver;
use crate::transaction::{Physical, TransactionCounter};
use crate::value::{Fields, Row, Value};

/// Refers to the result of one [`Database::execute`] call.
///
/// Only the most recent handle is live; any statement run through the same
/// [`Database`] afterwards makes it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultHandle {
    generation: u64,
}

#[derive(Debug)]
struct CurrentResult {
    generation: u64,
    output: StatementOutput,
    cursor: usize,
}

/// One database session plus the bookkeeping layered on top of it.
///
/// Not meant for concurrent use; open one handle per thread. The transaction
/// depth must be back at zero before the handle goes away: [`Database::close`]
/// and `Drop` both panic otherwise.
pub struct Database<D: Driver = BoxedDriver> {
    name: String,
    driver: D,
    tx: TransactionCounter,
    current: Option<CurrentResult>,
    generation: u64,
}

impl Database<BoxedDriver> {
    /// Open a handle as described by `config`.
    pub fn connect(name: &str, config: &DatabaseConfig) -> Result<Self> {
        let driver = config.open_driver()?;
        Ok(Self::new(name, driver))
    }

    /// Open a handle on a fresh embedded database.
    pub fn in_memory(name: &str) -> Result<Self> {
        Ok(Self::new(name, Box::new(SqliteDriver::open_in_memory()?)))
    }
}

impl<D: Driver> Database<D> {
    pub fn new(name: &str, driver: D) -> Self {
        info!(db = name, dialect = driver.dialect().name(), "database handle opened");
        Self {
            name: name.to_string(),
            driver,
            tx: TransactionCounter::new(),
            current: None,
            generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Number of unmatched [`begin`](Self::begin) calls.
    pub fn depth(&self) -> u32 {
        self.tx.depth()
    }

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<StatementOutput> {
        debug!(db = %self.name, sql, params = params.len(), "executing statement");
        self.driver
            .execute(sql, params)
            .map_err(|source| DbError::Driver {
                sql: sql.to_string(),
                source,
            })
    }

    /// Run a parameterized statement, binding `params` to its `?` placeholders
    /// in order. The returned handle invalidates every earlier one.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultHandle> {
        // The previous result is gone even if this statement fails.
        self.current = None;
        self.generation += 1;
        let output = self.run(sql, params)?;
        self.current = Some(CurrentResult {
            generation: self.generation,
            output,
            cursor: 0,
        });
        Ok(ResultHandle {
            generation: self.generation,
        })
    }

    /// Handle of the most recent successful statement, if it is still live.
    pub fn last_result(&self) -> Option<ResultHandle> {
        self.current.as_ref().map(|c| ResultHandle {
            generation: c.generation,
        })
    }

    fn live_result(&mut self, handle: ResultHandle) -> Result<&mut CurrentResult> {
        match self.current.as_mut() {
            Some(current) if current.generation == handle.generation => Ok(current),
            _ => Err(DbError::logic(format!(
                "stale result handle on database '{}'",
                self.name
            ))),
        }
    }

    /// Next row of `handle` as a column-name map, `None` once exhausted.
    pub fn fetch_assoc(&mut self, handle: ResultHandle) -> Result<Option<Row>> {
        let current = self.live_result(handle)?;
        let Some(values) = current.output.rows.get(current.cursor) else {
            return Ok(None);
        };
        let row = Row::new(&current.output.columns, values.clone());
        current.cursor += 1;
        Ok(Some(row))
    }

    /// All rows of `handle` not fetched yet.
    pub fn fetch_all(&mut self, handle: ResultHandle) -> Result<Vec<Row>> {
        let current = self.live_result(handle)?;
        let columns = &current.output.columns;
        let rows = current.output.rows[current.cursor..]
            .iter()
            .map(|values| Row::new(columns, values.clone()))
            .collect();
        current.cursor = current.output.rows.len();
        Ok(rows)
    }

    /// Rows returned by a query, or rows affected by a DML statement.
    ///
    /// Statements that neither return rows nor change any (DDL, `BEGIN`,
    /// `SET`) report whatever change count the driver still holds; SQLite
    /// keeps the count of the last INSERT/UPDATE/DELETE.
    pub fn num_rows(&mut self, handle: ResultHandle) -> Result<u64> {
        Ok(self.live_result(handle)?.output.row_count())
    }

    /// Id generated by the most recent INSERT, 0 if nothing has run yet.
    pub fn last_insert_id(&self) -> i64 {
        if self.generation == 0 {
            return 0;
        }
        self.driver.last_insert_id()
    }

    pub(crate) fn quote_ident(&self, name: &str) -> Result<String> {
        if !is_valid_identifier(name) {
            return Err(DbError::logic(format!("invalid identifier '{}'", name)));
        }
        let q = self.dialect().quote_char();
        Ok(name
            .split('.')
            .map(|part| format!("{q}{part}{q}"))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Insert one row built from `fields` and return the generated id.
    pub fn insert(&mut self, table: &str, fields: &Fields) -> Result<i64> {
        if fields.is_empty() {
            return Err(DbError::logic(format!("insert into '{}' with no fields", table)));
        }
        let table = self.quote_ident(table)?;
        let columns = fields
            .names()
            .map(|name| self.quote_ident(name))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; fields.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );
        let params: Vec<Value> = fields.values().cloned().collect();
        self.execute(&sql, &params)?;
        Ok(self.driver.last_insert_id())
    }

    fn set_clause(&self, fields: &Fields) -> Result<String> {
        Ok(fields
            .names()
            .map(|name| Ok(format!("{} = ?", self.quote_ident(name)?)))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }

    /// Update rows matching every `column = value` pair of `filter` and return
    /// the number of rows changed. An empty filter updates the whole table.
    ///
    /// Text filter values are trimmed and cleaned with
    /// [`remove_nbsp`](crate::sanitize::remove_nbsp) before binding.
    pub fn update(&mut self, table: &str, filter: &Fields, fields: &Fields) -> Result<u64> {
        if fields.is_empty() {
            return Err(DbError::logic(format!("update of '{}' with no fields", table)));
        }
        let mut sql = format!("UPDATE {} SET {}", self.quote_ident(table)?, self.set_clause(fields)?);
        let mut params: Vec<Value> = fields.values().cloned().collect();

        if !filter.is_empty() {
            let mut conditions = Vec::with_capacity(filter.len());
            for (name, value) in filter.iter() {
                conditions.push(format!("{} = ?", self.quote_ident(name)?));
                params.push(match value {
                    Value::Text(s) => Value::Text(remove_nbsp(s)),
                    other => other.clone(),
                });
            }
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let handle = self.execute(&sql, &params)?;
        self.num_rows(handle)
    }

    /// Update rows matching a literal WHERE clause. `params` bind to the
    /// clause's placeholders after the SET values.
    pub fn update_where(
        &mut self,
        table: &str,
        fields: &Fields,
        where_clause: &str,
        params: &[Value],
    ) -> Result<u64> {
        if fields.is_empty() {
            return Err(DbError::logic(format!("update of '{}' with no fields", table)));
        }
        let mut sql = format!("UPDATE {} SET {}", self.quote_ident(table)?, self.set_clause(fields)?);
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        let mut bound: Vec<Value> = fields.values().cloned().collect();
        bound.extend_from_slice(params);

        let handle = self.execute(&sql, &bound)?;
        self.num_rows(handle)
    }

    /// Delete rows matching `where_clause` and return how many went away.
    ///
    /// The clause is required; clearing a table goes through [`execute`](Self::execute).
    pub fn delete(&mut self, table: &str, where_clause: &str, params: &[Value]) -> Result<u64> {
        if where_clause.trim().is_empty() {
            return Err(DbError::logic(format!("delete from '{}' without a WHERE clause", table)));
        }
        let sql = format!("DELETE FROM {} WHERE {}", self.quote_ident(table)?, where_clause);
        let handle = self.execute(&sql, params)?;
        self.num_rows(handle)
    }

    fn lookup_tables(&mut self, pattern: String) -> Result<bool> {
        let sql = self.dialect().table_lookup_sql();
        let handle = self.execute(sql, &[Value::Text(pattern)])?;
        Ok(self.num_rows(handle)? > 0)
    }

    /// Whether a table named exactly `table` exists.
    pub fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.lookup_tables(escape_like(table))
    }

    /// Whether any table name contains `fragment`.
    pub fn table_exists_like(&mut self, fragment: &str) -> Result<bool> {
        self.lookup_tables(format!("%{}%", escape_like(fragment)))
    }

    /// Set the session character set. SQLite text is always UTF-8, so only
    /// the MySQL dialect sends anything.
    pub fn set_character(&mut self, encoding: &str) -> Result<()> {
        if !is_valid_charset(encoding) {
            return Err(DbError::logic(format!("invalid character set '{}'", encoding)));
        }
        match self.dialect() {
            Dialect::Mysql => {
                for var in ["client", "results", "connection"] {
                    let sql = format!("SET character_set_{} = '{}'", var, encoding);
                    self.execute(&sql, &[])?;
                }
            }
            Dialect::Sqlite => {
                debug!(db = %self.name, encoding, "sqlite text is utf-8, character set unchanged");
            }
        }
        Ok(())
    }

    /// Zero-based page on which the row whose `field` equals `id` appears when
    /// `page_items` rows make a page. Returns 0 when the row is absent.
    ///
    /// `search` becomes the WHERE clause (with `params` bound) and `postfix`
    /// is appended verbatim, typically an ORDER BY.
    #[allow(clippy::too_many_arguments)]
    pub fn item_at_page(
        &mut self,
        table: &str,
        field: &str,
        id: impl Into<Value>,
        page_items: u64,
        search: &str,
        params: &[Value],
        postfix: &str,
    ) -> Result<u64> {
        if page_items == 0 {
            return Ok(0);
        }
        let sql = format!("SELECT {} FROM {}", self.quote_ident(field)?, self.quote_ident(table)?);
        self.page_of(sql, id.into(), page_items, search, params, postfix)
    }

    /// Like [`item_at_page`](Self::item_at_page), over `table1 LEFT JOIN
    /// table2` on the shared `field`. `search` and `postfix` may refer to
    /// columns of either table.
    #[allow(clippy::too_many_arguments)]
    pub fn item_at_page_join(
        &mut self,
        table1: &str,
        table2: &str,
        field: &str,
        id: impl Into<Value>,
        page_items: u64,
        search: &str,
        params: &[Value],
        postfix: &str,
    ) -> Result<u64> {
        if page_items == 0 {
            return Ok(0);
        }
        let t1 = self.quote_ident(table1)?;
        let t2 = self.quote_ident(table2)?;
        let field = self.quote_ident(field)?;
        let sql = format!(
            "SELECT {t1}.{field} FROM {t1} LEFT JOIN {t2} ON {t1}.{field} = {t2}.{field}"
        );
        self.page_of(sql, id.into(), page_items, search, params, postfix)
    }

    fn page_of(
        &mut self,
        mut sql: String,
        id: Value,
        page_items: u64,
        search: &str,
        params: &[Value],
        postfix: &str,
    ) -> Result<u64> {
        if !search.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(search);
        }
        if !postfix.is_empty() {
            sql.push(' ');
            sql.push_str(postfix);
        }

        let handle = self.execute(&sql, params)?;
        let mut position = 0u64;
        while let Some(row) = self.fetch_assoc(handle)? {
            if row.iter().next().is_some_and(|(_, v)| v.matches(&id)) {
                return Ok(position / page_items);
            }
            position += 1;
        }
        Ok(0)
    }

    fn issue(&mut self, physical: Physical) -> Result<()> {
        self.run(physical.sql(), &[]).map(|_| ())
    }

    /// Enter a (possibly nested) transaction.
    pub fn begin(&mut self) -> Result<()> {
        let mut tx = std::mem::take(&mut self.tx);
        let res = tx.begin(|p| self.issue(p));
        self.tx = tx;
        res
    }

    /// Leave one transaction level, committing when the outermost one closes.
    pub fn commit(&mut self) -> Result<()> {
        let mut tx = std::mem::take(&mut self.tx);
        let res = tx.commit(|p| self.issue(p));
        self.tx = tx;
        res
    }

    /// Roll back the entire transaction, whatever the current depth.
    pub fn rollback(&mut self) -> Result<()> {
        let mut tx = std::mem::take(&mut self.tx);
        let res = tx.rollback(|p| self.issue(p));
        self.tx = tx;
        res
    }

    /// Release the session.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is still open; that is a caller bug.
    pub fn close(self) {
        assert!(
            !self.tx.is_active(),
            "database '{}' closed with {} open transaction level(s)",
            self.name,
            self.tx.depth()
        );
        info!(db = %self.name, "database handle closed");
    }
}

impl<D: Driver> Drop for Database<D> {
    fn drop(&mut self) {
        if !self.tx.is_active() {
            return;
        }
        if std::thread::panicking() {
            error!(
                db = %self.name,
                depth = self.tx.depth(),
                "database handle dropped with an open transaction during unwind"
            );
            return;
        }
        panic!(
            "database '{}' dropped with {} open transaction level(s)",
            self.name,
            self.tx.depth()
        );
    }
}

impl<D: Driver> std::fmt::Debug for Database<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("dialect", &self.dialect())
            .field("depth", &self.tx.depth())
            .finish()
    }
}
