//! # attrdb
//!
//! A small data-access layer: describe a query as an attribute model, let the
//! crate compile it into parameterized SQL, run it against MySQL, PostgreSQL
//! or SQLite, and get rows back as attribute models.
//!
//! ## Features
//!
//! - **No SQL strings**: tables, `table.attr` values with comparators, joins,
//!   ordering, paging, projections, assignments and `RETURNING` columns all
//!   live on an [`AttributeModel`]
//! - **Atomic setters**: a rejected setter leaves the model untouched
//! - **Backend aware**: placeholders, alias quoting, `RETURNING` and
//!   `OFFSET` rules follow the connected [`Backend`]
//! - **Transactional writes**: multi-table INSERT / UPDATE / DELETE run in one
//!   transaction, joining the caller's transaction when one is active
//! - **Safe defaults**: DELETE requires a predicate, UPDATE requires an
//!   assignment
//! - **Query logging**: every statement is emitted through `tracing` with its
//!   literal-substituted debug SQL
//!
//! ## Example
//!
//! ```
//! use attrdb::{AttributeModel, Comparator, ConnectionConfig, Database, fragment};
//!
//! let mut db = Database::connect(ConnectionConfig::sqlite_memory())?;
//! db.execute(&fragment("CREATE TABLE users (id INTEGER, name TEXT, age INTEGER)"))?;
//!
//! // INSERT
//! let mut alice = AttributeModel::with_tables(["users"])?;
//! alice
//!     .set_attribute("id", 1)?
//!     .set_attribute("name", "alice")?
//!     .set_attribute("age", 34)?;
//! db.execute_insert(&alice)?;
//!
//! // SELECT
//! let mut adults = AttributeModel::with_tables(["users"])?;
//! adults
//!     .set("age", Comparator::Gte, 21)?
//!     .set_attribute_str("name *? \"ice\"")?;
//! let rows = db.execute_select(&adults)?;
//! assert_eq!(rows.len(), 1);
//!
//! // UPDATE
//! let mut rename = AttributeModel::with_tables(["users"])?;
//! rename.set_attribute("id", 1)?.set_update("name", "alicia")?;
//! assert_eq!(db.execute_update(&rename)?.affected, 1);
//!
//! // DELETE
//! let mut gone = AttributeModel::with_tables(["users"])?;
//! gone.set_attribute("name", "alicia")?;
//! assert_eq!(db.execute_delete(&gone)?.affected, 1);
//! # Ok::<(), attrdb::Error>(())
//! ```

pub mod backend;
pub mod comparator;
pub mod compile;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod ident;
pub mod model;
pub mod parse;
pub mod trace;
pub mod value;

pub use backend::Backend;
pub use comparator::{Comparator, is_valid_comparator};
pub use config::{ConnectionConfig, is_valid_iana_port};
pub use driver::{Connection, DriverError, ResultColumn, ResultSet, connect};
pub use engine::{Database, WriteOutcome};
pub use error::{Error, Result};
pub use fragment::{QueryFragment, QueryType, fragment};
pub use ident::{AttributeName, MAX_IDENTIFIER_LEN, is_valid_identifier, parse_attribute_name};
pub use model::{Attribute, AttributeModel, JoinType, Relationship, UNKNOWN_TABLE};
pub use parse::{
    Direction, OUTER_JOIN_MARKER, ParsedAttribute, parse_attribute, parse_order, parse_update,
};
pub use trace::SqlTracer;
pub use value::{Bind, ParamType, Value};
