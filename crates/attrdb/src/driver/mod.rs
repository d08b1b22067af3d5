//! Blocking backend connections.
//!
//! [`Connection`] is the seam between the engine and a database driver. SQL
//! arrives with placeholders already rendered for the backend and values
//! already coerced to their bind types; drivers only move data.

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlConnection;
#[cfg(feature = "postgres")]
pub use self::postgres::PgConnection;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteConnection;

use crate::backend::Backend;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;

/// A driver failure: backend code plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// SQLSTATE (or the closest the driver reports); may be empty
    pub code: String,
    pub message: String,
}

impl DriverError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}

impl std::error::Error for DriverError {}

/// A result column as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    /// Source table, when the driver reports one
    pub table: Option<String>,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
        }
    }

    pub fn with_table(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()).filter(|t: &String| !t.is_empty()),
        }
    }
}

/// Columns and rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

/// One open database connection.
///
/// Implementations block until the backend answers. A connection is used by
/// one engine at a time.
pub trait Connection: Send {
    /// Run a row-returning statement.
    fn query(&mut self, sql: &str, params: &[Value]) -> std::result::Result<ResultSet, DriverError>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> std::result::Result<u64, DriverError>;

    /// Run parameterless SQL such as transaction control.
    fn batch_execute(&mut self, sql: &str) -> std::result::Result<(), DriverError>;
}

/// Open a connection for `config`.
pub fn connect(config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
    config.validate()?;
    match config.backend {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Box::new(SqliteConnection::open(config)?)),
        #[cfg(feature = "postgres")]
        Backend::Postgres => Ok(Box::new(PgConnection::open(config)?)),
        #[cfg(feature = "mysql")]
        Backend::MySql => Ok(Box::new(MySqlConnection::open(config)?)),
        #[allow(unreachable_patterns)]
        other => Err(Error::capability(format!(
            "attrdb was built without the {other} backend feature"
        ))),
    }
}

pub(crate) fn connection_error(config: &ConnectionConfig, e: impl fmt::Display) -> Error {
    Error::Connection(format!("{}: {e}", config.dsn()))
}
