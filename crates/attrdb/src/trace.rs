//! `tracing` output for executed statements and transaction control.
//!
//! Statements go to target `attrdb.sql`, transaction events to `attrdb.tx`.
//! The SQL logged is the debug rendering with literals substituted.

use crate::backend::Backend;
use crate::fragment::QueryFragment;
use tracing::Level;

/// Default SQL length (bytes) before truncation.
pub const DEFAULT_MAX_SQL_LENGTH: usize = 200;

/// Emits one event per executed statement.
#[derive(Debug, Clone)]
pub struct SqlTracer {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlTracer {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(DEFAULT_MAX_SQL_LENGTH),
        }
    }
}

impl SqlTracer {
    /// A tracer at INFO when `debug` is set, DEBUG otherwise.
    pub fn new(debug: bool, max_sql_length: Option<usize>) -> Self {
        Self {
            level: if debug { Level::INFO } else { Level::DEBUG },
            max_sql_length,
        }
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Log a statement about to run.
    pub fn statement(&self, backend: Backend, q: &QueryFragment) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&q.query_debug());
        emit_at_level!(
            self.level,
            target: "attrdb.sql",
            backend = %backend,
            query_type = q.query_type().as_str(),
            param_count = q.binds().len(),
            sql = %sql,
        );
    }
}

pub(crate) fn transaction_event(backend: Backend, action: &'static str) {
    tracing::debug!(target: "attrdb.tx", backend = %backend, action);
}

pub(crate) fn rollback_failed(backend: Backend, error: &crate::Error) {
    tracing::warn!(target: "attrdb.tx", backend = %backend, error = %error, "rollback failed");
}

/// Truncate to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
