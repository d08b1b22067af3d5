//! Supported database backends and their SQL dialect differences.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A relational backend, keyed by its connection type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// `mysql`
    MySql,
    /// `pgsql`
    Postgres,
    /// `sqlite`
    Sqlite,
}

impl Backend {
    /// Every backend, in tag order.
    pub const ALL: [Backend; 3] = [Backend::MySql, Backend::Postgres, Backend::Sqlite];

    /// The connection type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::MySql => "mysql",
            Backend::Postgres => "pgsql",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Tags accepted by [`Backend::from_str`].
    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|b| b.as_str()).collect()
    }

    /// Default TCP port, if the backend is networked.
    pub fn default_port(self) -> Option<u16> {
        match self {
            Backend::MySql => Some(3306),
            Backend::Postgres => Some(5432),
            Backend::Sqlite => None,
        }
    }

    /// Whether INSERT / UPDATE / DELETE accept a `RETURNING` clause.
    pub fn supports_returning(self) -> bool {
        matches!(self, Backend::Postgres | Backend::Sqlite)
    }

    /// Whether `OFFSET` may appear without `LIMIT`.
    pub fn allows_offset_without_limit(self) -> bool {
        matches!(self, Backend::Postgres)
    }

    /// Whether the driver reports the source table of each result column.
    pub fn reports_column_tables(self) -> bool {
        matches!(self, Backend::MySql)
    }

    /// Statement that opens a transaction.
    pub fn begin_sql(self) -> &'static str {
        match self {
            Backend::MySql => "START TRANSACTION",
            Backend::Postgres | Backend::Sqlite => "BEGIN",
        }
    }

    /// Quote a result-column alias such as `users.id`.
    pub fn quote_alias(self, alias: &str) -> String {
        match self {
            Backend::MySql => format!("`{alias}`"),
            Backend::Postgres | Backend::Sqlite => format!("\"{alias}\""),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            other => Err(Error::validation(format!(
                "Unsupported database type: {other} (expected one of {})",
                Self::supported().join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Backend> for String {
    fn from(b: Backend) -> Self {
        b.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_aliases() {
        assert_eq!("mysql".parse::<Backend>().unwrap(), Backend::MySql);
        assert_eq!("pgsql".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("PostgreSQL".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert!("oracle".parse::<Backend>().unwrap_err().is_validation());
    }

    #[test]
    fn supported_tags() {
        assert_eq!(Backend::supported(), vec!["mysql", "pgsql", "sqlite"]);
    }

    #[test]
    fn dialect_quirks() {
        assert!(!Backend::MySql.supports_returning());
        assert!(Backend::Sqlite.supports_returning());
        assert!(!Backend::Sqlite.allows_offset_without_limit());
        assert!(Backend::Postgres.allows_offset_without_limit());
        assert!(Backend::MySql.reports_column_tables());
        assert!(!Backend::Sqlite.reports_column_tables());
        assert_eq!(Backend::MySql.quote_alias("t.a"), "`t.a`");
        assert_eq!(Backend::Postgres.quote_alias("t.a"), "\"t.a\"");
    }
}
