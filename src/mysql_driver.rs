//! [`Driver`] over the blocking `mysql` client. Enabled by the `mysql` feature.

use mysql::prelude::{Protocol, Queryable};
use mysql::{Conn, OptsBuilder, Params, QueryResult};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::driver::{Dialect, Driver, StatementOutput};
use crate::error::{DbError, DriverError, Result};
use crate::sanitize::is_valid_charset;
use crate::value::Value;

fn to_mysql(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Integer(i) => mysql::Value::Int(*i),
        Value::Real(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
        Value::Boolean(b) => mysql::Value::Int(i64::from(*b)),
    }
}

fn from_mysql(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(i) => Value::Integer(i),
        mysql::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql::Value::Float(f) => Value::Real(f64::from(f)),
        mysql::Value::Double(f) => Value::Real(f),
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Blob(e.into_bytes()),
        },
        mysql::Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
        mysql::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                hours,
                minutes,
                seconds
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
    }
}

fn collect<P: Protocol>(
    mut result: QueryResult<'_, '_, '_, P>,
) -> std::result::Result<StatementOutput, DriverError> {
    let columns: Vec<String> = result
        .columns()
        .as_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let rows_affected = result.affected_rows();

    let mut rows = Vec::new();
    for row in result.by_ref() {
        let values = row?.unwrap_raw();
        rows.push(
            values
                .into_iter()
                .map(|v| v.map_or(Value::Null, from_mysql))
                .collect(),
        );
    }

    Ok(StatementOutput {
        columns,
        rows,
        rows_affected,
    })
}

/// [`Driver`] backed by one MySQL connection.
pub struct MysqlDriver {
    conn: Conn,
}

impl MysqlDriver {
    /// Connect with `config`, then switch the session to `config.charset`.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        if !is_valid_charset(&config.charset) {
            return Err(DbError::config(format!(
                "invalid character set '{}'",
                config.charset
            )));
        }
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.as_deref().unwrap_or("localhost")))
            .tcp_port(config.port)
            .db_name(Some(config.database.as_str()))
            .user(config.user.as_deref())
            .pass(config.password.as_deref())
            .init(vec![format!("SET NAMES {}", config.charset)]);
        let conn = Conn::new(opts).map_err(|e| DbError::connect(config.target(), e))?;
        info!(target = %config.target(), "opened mysql connection");
        Ok(Self { conn })
    }
}

impl Driver for MysqlDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> std::result::Result<StatementOutput, DriverError> {
        // BEGIN, SET and SHOW cannot go through the binary protocol.
        if params.is_empty() {
            return collect(self.conn.query_iter(sql)?);
        }
        let params = Params::Positional(params.iter().map(to_mysql).collect());
        collect(self.conn.exec_iter(sql, params)?)
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_id() as i64
    }
}
