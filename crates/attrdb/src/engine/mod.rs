//! The execution engine.
//!
//! A [`Database`] owns one backend connection. It compiles attribute models
//! into statements, runs them, and materializes result rows back into
//! [`AttributeModel`]s.
//!
//! Multi-table writes run inside one transaction. When the engine is already
//! inside a transaction the write joins it and leaves commit / rollback to
//! whoever opened it.
//!
//! # Example
//!
//! ```
//! use attrdb::{AttributeModel, ConnectionConfig, Database};
//!
//! let mut db = Database::connect(ConnectionConfig::sqlite_memory())?;
//! db.execute(&attrdb::fragment("CREATE TABLE users (id INTEGER, name TEXT)"))?;
//!
//! let mut user = AttributeModel::with_tables(["users"])?;
//! user.set_attribute("id", 1)?.set_attribute("name", "bob")?;
//! db.execute_insert(&user)?;
//!
//! let rows = db.execute_select(&AttributeModel::with_tables(["users"])?)?;
//! assert_eq!(rows[0].attribute("users.name")?, Some(&attrdb::Value::from("bob")));
//! # Ok::<(), attrdb::Error>(())
//! ```


use crate::backend::Backend;
use crate::compile;
use crate::config::ConnectionConfig;
use crate::driver::{self, Connection, DriverError, ResultSet};
use crate::error::{Error, Result};
use crate::fragment::{QueryFragment, QueryType, fragment};
use crate::model::{AttributeModel, UNKNOWN_TABLE};
use crate::trace::{self, SqlTracer};
use std::fmt;

/// What a write call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    /// Rows affected, summed over every statement
    pub affected: u64,
    /// Rows returned through `RETURNING`, one model per row
    pub returned: Vec<AttributeModel>,
}

/// One connection plus the statement and transaction machinery around it.
pub struct Database {
    backend: Backend,
    config: ConnectionConfig,
    conn: Box<dyn Connection>,
    tracer: SqlTracer,
    in_transaction: bool,
    debug_sql: Vec<String>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("dsn", &self.config.dsn())
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open a connection for `config`.
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        let conn = driver::connect(&config)?;
        Ok(Self::with_connection(conn, config))
    }

    /// Wrap an already-open connection to `config.backend`.
    pub fn with_connection(conn: Box<dyn Connection>, config: ConnectionConfig) -> Self {
        Self {
            backend: config.backend,
            tracer: SqlTracer::new(config.debug, config.log_sql_max_len),
            config,
            conn,
            in_transaction: false,
            debug_sql: Vec::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// DSN of the connection, without password.
    pub fn dsn(&self) -> String {
        self.config.dsn()
    }

    /// Debug SQL of every statement run by the last `execute_*` call, one per
    /// line. For logging only.
    pub fn last_debug_sql(&self) -> String {
        self.debug_sql.join("\n")
    }

    // ==================== Transactions ====================

    /// Whether a transaction opened through this engine is active.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open a transaction. Fails if one is already active.
    pub fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::transaction("A transaction is already active"));
        }
        self.control(self.backend.begin_sql())?;
        self.in_transaction = true;
        trace::transaction_event(self.backend, "begin");
        Ok(())
    }

    /// Commit the active transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT", "commit")
    }

    /// Roll back the active transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK", "rollback")
    }

    fn finish(&mut self, sql: &str, action: &'static str) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::transaction(format!("Cannot {action}: no active transaction")));
        }
        // The backend ends the transaction even when COMMIT fails.
        self.in_transaction = false;
        self.control(sql)?;
        trace::transaction_event(self.backend, action);
        Ok(())
    }

    fn control(&mut self, sql: &str) -> Result<()> {
        self.conn
            .batch_execute(sql)
            .map_err(|e| Error::transaction(format!("{sql} failed: {e}")))
    }

    /// Run `f` inside a transaction.
    ///
    /// Without an active transaction one is opened, committed when `f`
    /// returns `Ok` and rolled back when it returns `Err`. Inside an active
    /// transaction `f` simply runs; the outer owner decides. Errors from `f`
    /// are returned unchanged.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.in_transaction {
            return f(self);
        }
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if self.in_transaction
                    && let Err(rollback_err) = self.rollback()
                {
                    trace::rollback_failed(self.backend, &rollback_err);
                }
                Err(e)
            }
        }
    }

    // ==================== Raw statements ====================

    /// Run a row-returning fragment (SELECT, WITH, PRAGMA, ... RETURNING)
    /// and materialize its rows.
    pub fn execute_query(&mut self, q: &QueryFragment) -> Result<Vec<AttributeModel>> {
        self.debug_sql.clear();
        Ok(self.run(q, None, true)?.1)
    }

    /// Run a fragment and return the number of affected rows, or of rows
    /// returned for SELECT and RETURNING statements.
    pub fn execute(&mut self, q: &QueryFragment) -> Result<u64> {
        self.debug_sql.clear();
        Ok(self.run(q, None, returns_rows(q))?.0)
    }

    /// Run one statement. With `rows` set the result set is materialized,
    /// using `table` for columns the driver cannot place.
    fn run(
        &mut self,
        q: &QueryFragment,
        table: Option<&str>,
        rows: bool,
    ) -> Result<(u64, Vec<AttributeModel>)> {
        if rows {
            let rows = materialize(self.fetch(q)?, table)?;
            return Ok((rows.len() as u64, rows));
        }
        let debug = self.prepare(q)?;
        let affected = self
            .conn
            .execute(&q.query_for(self.backend), &q.bind_values())
            .map_err(|e| driver_failure(debug, e))?;
        Ok((affected, Vec::new()))
    }

    /// Run a row-returning statement and hand back the raw result set.
    fn fetch(&mut self, q: &QueryFragment) -> Result<ResultSet> {
        let debug = self.prepare(q)?;
        self.conn
            .query(&q.query_for(self.backend), &q.bind_values())
            .map_err(|e| driver_failure(debug, e))
    }

    /// Refuse unbalanced fragments, then trace and record the statement.
    fn prepare(&mut self, q: &QueryFragment) -> Result<String> {
        let debug = q.query_debug();
        if !q.is_balanced() {
            return Err(Error::validation(format!(
                "Placeholder count {} does not match bind count {}: {debug}",
                q.placeholder_count(),
                q.binds().len()
            )));
        }
        self.tracer.statement(self.backend, q);
        self.debug_sql.push(debug.clone());
        Ok(debug)
    }

    // ==================== Model statements ====================

    /// SELECT rows matching `model`.
    ///
    /// Columns are qualified by alias when the model has selects, by the
    /// driver when it reports a source table, or by the model's only table.
    /// A multi-table model without selects on a backend that cannot place
    /// columns is first expanded to every column of every table, so joined
    /// columns sharing a name stay apart.
    pub fn execute_select(&mut self, model: &AttributeModel) -> Result<Vec<AttributeModel>> {
        self.debug_sql.clear();
        if model.offset().is_some()
            && model.limit().is_none()
            && !self.backend.allows_offset_without_limit()
        {
            return Err(Error::capability(format!(
                "{} does not allow queries that contain OFFSET without LIMIT",
                self.backend
            )));
        }
        let mut q = compile::select_statement(model, self.backend)?;
        if model.selects().is_empty()
            && model.table_count() > 1
            && !self.backend.reports_column_tables()
        {
            let expanded = self.expand_selects(model)?;
            q = compile::select_statement(&expanded, self.backend)?;
        }
        let sole = sole_table(model);
        Ok(self.run(&q, sole.as_deref(), true)?.1)
    }

    /// A copy of `model` selecting every column of each of its tables.
    fn expand_selects(&mut self, model: &AttributeModel) -> Result<AttributeModel> {
        let mut expanded = model.clone();
        for table in model.tables() {
            let columns = self.fetch(&fragment(format!("SELECT * FROM {table} LIMIT 0")))?;
            for column in &columns.columns {
                expanded.add_select(&format!("{table}.{}", column.name))?;
            }
        }
        Ok(expanded)
    }

    /// INSERT every table's attributes, one statement per table, atomically.
    pub fn execute_insert(&mut self, model: &AttributeModel) -> Result<WriteOutcome> {
        self.execute_inserts(std::slice::from_ref(model))
    }

    /// INSERT several models in one transaction.
    pub fn execute_inserts(&mut self, models: &[AttributeModel]) -> Result<WriteOutcome> {
        self.debug_sql.clear();
        let mut statements = Vec::new();
        for model in models {
            self.check_returning(model)?;
            statements.extend(compile::insert_statements(model));
        }
        self.write_all(statements)
    }

    /// UPDATE every table with assignments, filtered by its attributes.
    pub fn execute_update(&mut self, model: &AttributeModel) -> Result<WriteOutcome> {
        self.debug_sql.clear();
        self.check_returning(model)?;
        let statements = compile::update_statements(model)?;
        self.write_all(statements)
    }

    /// DELETE from every table, filtered by its attributes.
    pub fn execute_delete(&mut self, model: &AttributeModel) -> Result<WriteOutcome> {
        self.debug_sql.clear();
        self.check_returning(model)?;
        let statements = compile::delete_statements(model)?;
        self.write_all(statements)
    }

    fn check_returning(&self, model: &AttributeModel) -> Result<()> {
        if !model.insert_returns().is_empty() && !self.backend.supports_returning() {
            return Err(Error::capability(format!(
                "{} does not support RETURNING",
                self.backend
            )));
        }
        Ok(())
    }

    fn write_all(&mut self, statements: Vec<(String, QueryFragment)>) -> Result<WriteOutcome> {
        if statements.is_empty() {
            return Ok(WriteOutcome::default());
        }
        self.transaction(|db| {
            let mut outcome = WriteOutcome::default();
            for (table, q) in &statements {
                let (affected, returned) = db.run(q, Some(table), q.has_returning())?;
                outcome.affected += affected;
                outcome.returned.extend(returned);
            }
            Ok(outcome)
        })
    }
}

fn returns_rows(q: &QueryFragment) -> bool {
    q.query_type() == QueryType::Select || q.has_returning()
}

fn sole_table(model: &AttributeModel) -> Option<String> {
    match model.table_count() {
        1 => model.tables().next().map(str::to_string),
        _ => None,
    }
}

fn driver_failure(debug: String, e: DriverError) -> Error {
    Error::execution(debug, e.code, e.message)
}

/// One model per row. Each column is placed under, in order of preference:
/// the `table.attr` alias it was selected as, the table the driver reports,
/// `fallback`, or [`UNKNOWN_TABLE`]. Two columns landing on the same
/// attribute are a Validation error.
fn materialize(rs: ResultSet, fallback: Option<&str>) -> Result<Vec<AttributeModel>> {
    rs.rows
        .into_iter()
        .map(|row| {
            let mut model = AttributeModel::new();
            for (column, value) in rs.columns.iter().zip(row) {
                let (table, name) = match (column.name.split_once('.'), &column.table) {
                    (Some((t, a)), _) => (t, a),
                    (None, Some(t)) => (t.as_str(), column.name.as_str()),
                    (None, None) => (fallback.unwrap_or(UNKNOWN_TABLE), column.name.as_str()),
                };
                model.put_result_value(table, name, value)?;
            }
            Ok(model)
        })
        .collect()
}
