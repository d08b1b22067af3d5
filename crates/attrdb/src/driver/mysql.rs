//! MySQL via the blocking `mysql` client.

use super::{Connection, DriverError, ResultColumn, ResultSet, connection_error};
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::value::Value;
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Params, Value as MyValue};

/// Session setup run on every (re)connect.
const INIT_SQL: &str = "SET NAMES utf8mb4";

pub struct MySqlConnection {
    conn: Conn,
}

impl MySqlConnection {
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let mut opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.as_deref().unwrap_or("localhost")))
            .db_name(Some(config.database.as_str()))
            .user(config.username.as_deref())
            .pass(config.password.as_deref())
            .init(vec![INIT_SQL]);
        if let Some(port) = config.effective_port() {
            opts = opts.tcp_port(port);
        }
        let conn = Conn::new(opts).map_err(|e| connection_error(config, e))?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection.
    pub fn from_conn(conn: Conn) -> Self {
        Self { conn }
    }
}

fn driver_error(e: mysql::Error) -> DriverError {
    match e {
        mysql::Error::MySqlError(e) => DriverError::new(e.state, e.message),
        other => DriverError::new("", other.to_string()),
    }
}

fn params(values: &[Value]) -> Params {
    if values.is_empty() {
        return Params::Empty;
    }
    Params::Positional(values.iter().map(to_mysql).collect())
}

fn to_mysql(value: &Value) -> MyValue {
    match value {
        Value::Null => MyValue::NULL,
        Value::Int(v) => MyValue::Int(*v),
        Value::Float(v) => MyValue::Double(*v),
        Value::Text(s) => MyValue::Bytes(s.as_bytes().to_vec()),
    }
}

fn from_mysql(value: &MyValue) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Bytes(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        MyValue::Int(v) => Value::Int(*v),
        MyValue::UInt(v) => i64::try_from(*v).map_or_else(|_| Value::Text(v.to_string()), Value::Int),
        MyValue::Float(v) => Value::Float(f64::from(*v)),
        MyValue::Double(v) => Value::Float(*v),
        MyValue::Date(y, m, d, 0, 0, 0, 0) => Value::Text(format!("{y:04}-{m:02}-{d:02}")),
        MyValue::Date(y, m, d, h, i, s, 0) => {
            Value::Text(format!("{y:04}-{m:02}-{d:02} {h:02}:{i:02}:{s:02}"))
        }
        MyValue::Date(y, m, d, h, i, s, us) => Value::Text(format!(
            "{y:04}-{m:02}-{d:02} {h:02}:{i:02}:{s:02}.{us:06}"
        )),
        MyValue::Time(neg, days, h, i, s, us) => {
            let sign = if *neg { "-" } else { "" };
            let hours = days * 24 + u32::from(*h);
            let frac = if *us > 0 { format!(".{us:06}") } else { String::new() };
            Value::Text(format!("{sign}{hours:02}:{i:02}:{s:02}{frac}"))
        }
    }
}

impl Connection for MySqlConnection {
    fn query(&mut self, sql: &str, values: &[Value]) -> std::result::Result<ResultSet, DriverError> {
        let mut result = self.conn.exec_iter(sql, params(values)).map_err(driver_error)?;
        let columns: Vec<ResultColumn> = result
            .columns()
            .as_ref()
            .iter()
            .map(|c| ResultColumn::with_table(c.name_str(), c.table_str()))
            .collect();

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row = row.map_err(driver_error)?;
            rows.push(
                (0..row.len())
                    .map(|i| row.as_ref(i).map_or(Value::Null, from_mysql))
                    .collect(),
            );
        }
        Ok(ResultSet { columns, rows })
    }

    fn execute(&mut self, sql: &str, values: &[Value]) -> std::result::Result<u64, DriverError> {
        self.conn
            .exec_drop(sql, params(values))
            .map_err(driver_error)?;
        Ok(self.conn.affected_rows())
    }

    fn batch_execute(&mut self, sql: &str) -> std::result::Result<(), DriverError> {
        self.conn.query_drop(sql).map_err(driver_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_values_render_as_text() {
        assert_eq!(
            from_mysql(&MyValue::Date(2024, 2, 9, 0, 0, 0, 0)),
            Value::from("2024-02-09")
        );
        assert_eq!(
            from_mysql(&MyValue::Date(2024, 2, 9, 13, 5, 7, 0)),
            Value::from("2024-02-09 13:05:07")
        );
        assert_eq!(
            from_mysql(&MyValue::Time(true, 1, 2, 3, 4, 0)),
            Value::from("-26:03:04")
        );
    }

    #[test]
    fn scalars_map_both_ways() {
        assert_eq!(to_mysql(&Value::from("é")), MyValue::Bytes("é".as_bytes().to_vec()));
        assert_eq!(from_mysql(&MyValue::UInt(u64::MAX)), Value::from(u64::MAX.to_string()));
        assert_eq!(from_mysql(&MyValue::Float(1.5)), Value::Float(1.5));
        assert!(matches!(params(&[]), Params::Empty));
    }
}
