//! SQLite via rusqlite.

use super::{Connection, DriverError, ResultColumn, ResultSet, connection_error};
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::value::Value;
use rusqlite::types::{Value as SqliteValue, ValueRef};

/// SQLite reports no SQLSTATE; failures use the generic one.
const GENERAL_ERROR: &str = "HY000";

pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open the database file named by `config.database` (`:memory:` or empty
    /// for an in-memory database) with foreign keys enforced.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let inner = if config.is_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&config.database)
        }
        .map_err(|e| connection_error(config, e))?;

        inner
            .execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| connection_error(config, e))?;
        Ok(Self { inner })
    }

    /// Wrap an already-open rusqlite connection.
    pub fn from_rusqlite(inner: rusqlite::Connection) -> Self {
        Self { inner }
    }
}

fn driver_error(e: rusqlite::Error) -> DriverError {
    DriverError::new(GENERAL_ERROR, e.to_string())
}

fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Int(v) => SqliteValue::Integer(*v),
        Value::Float(v) => SqliteValue::Real(*v),
        Value::Text(s) => SqliteValue::Text(s.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(text) | ValueRef::Blob(text) => {
            Value::Text(String::from_utf8_lossy(text).into_owned())
        }
    }
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> std::result::Result<ResultSet, DriverError> {
        let params: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let mut stmt = self.inner.prepare(sql).map_err(driver_error)?;
        let columns: Vec<ResultColumn> = stmt
            .column_names()
            .into_iter()
            .map(ResultColumn::new)
            .collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(driver_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(driver_error)? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(from_sqlite))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(driver_error)?;
            out.push(values);
        }
        Ok(ResultSet { columns, rows: out })
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> std::result::Result<u64, DriverError> {
        let params: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let n = self
            .inner
            .execute(sql, rusqlite::params_from_iter(params.iter()))
            .map_err(driver_error)?;
        Ok(n as u64)
    }

    fn batch_execute(&mut self, sql: &str) -> std::result::Result<(), DriverError> {
        self.inner.execute_batch(sql).map_err(driver_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> SqliteConnection {
        SqliteConnection::open(&ConnectionConfig::sqlite_memory()).unwrap()
    }

    #[test]
    fn round_trips_values() {
        let mut c = conn();
        c.batch_execute("CREATE TABLE t (a INTEGER, b REAL, c TEXT, d TEXT)")
            .unwrap();
        let n = c
            .execute(
                "INSERT INTO t (a, b, c, d) VALUES (?, ?, ?, ?)",
                &[Value::Int(1), Value::Float(2.5), Value::from("x"), Value::Null],
            )
            .unwrap();
        assert_eq!(n, 1);

        let rs = c.query("SELECT a, b, c, d FROM t", &[]).unwrap();
        let names: Vec<_> = rs.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(
            rs.rows,
            vec![vec![Value::Int(1), Value::Float(2.5), Value::from("x"), Value::Null]]
        );
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let mut c = conn();
        c.batch_execute(
            "CREATE TABLE p (id INTEGER PRIMARY KEY);
             CREATE TABLE ch (pid INTEGER REFERENCES p(id));",
        )
        .unwrap();
        let err = c
            .execute("INSERT INTO ch (pid) VALUES (?)", &[Value::Int(9)])
            .unwrap_err();
        assert_eq!(err.code, "HY000");
    }
}
