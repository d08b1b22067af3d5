//! The attribute model.
//!
//! An [`AttributeModel`] is an elaborate map from table columns to values. It
//! accumulates everything needed to generate a statement without writing SQL:
//!
//! - per-table attributes, each a value plus a [`Comparator`]
//! - join relationships between tables
//! - ORDER BY entries, LIMIT / OFFSET
//! - SELECT projections, UPDATE assignments and RETURNING columns
//!
//! Every setter validates before it mutates, so a failed call leaves the model
//! exactly as it was. Batch setters (`set_tables`, `set_order`, ...) restore
//! the whole pre-call state when any element fails.
//!
//! # Example
//! ```
//! use attrdb::{AttributeModel, Comparator};
//!
//! let mut users = AttributeModel::with_tables(["users"])?;
//! users
//!     .set("age", Comparator::Gte, 21)?
//!     .set_attribute_str("name *?* \"bob\"")?
//!     .add_order("name", Default::default())?;
//!
//! assert_eq!(users.to_string(), "{[users.age >= 21, users.name *?* bob]}");
//! # Ok::<(), attrdb::Error>(())
//! ```

mod relationship;


pub use relationship::{JoinType, Relationship};

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::ident::{AttributeName, parse_attribute_name, table_ident};
use crate::parse::{Direction, parse_attribute, parse_order, parse_update};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// Table under which result columns with no recoverable table are stored.
pub const UNKNOWN_TABLE: &str = "unknown_table";

/// An attribute's value and the comparator applied to it in WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub value: Value,
    pub comparator: Comparator,
}

/// Tables, attributes, joins and statement shaping for one query cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeModel {
    tables: IndexMap<String, IndexMap<String, Attribute>>,
    order: IndexMap<String, Direction>,
    relationships: Vec<Relationship>,
    selects: Vec<String>,
    updates: IndexMap<String, Value>,
    insert_returns: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    case_sensitive: bool,
}

impl Default for AttributeModel {
    fn default() -> Self {
        Self {
            tables: IndexMap::new(),
            order: IndexMap::new(),
            relationships: Vec::new(),
            selects: Vec::new(),
            updates: IndexMap::new(),
            insert_returns: Vec::new(),
            limit: None,
            offset: None,
            case_sensitive: true,
        }
    }
}

impl AttributeModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model with the given tables registered.
    pub fn with_tables<I, S>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = Self::new();
        model.set_tables(tables)?;
        Ok(model)
    }

    /// Run `f`, restoring the pre-call state if it fails.
    fn atomically(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<&mut Self> {
        let backup = self.clone();
        if let Err(e) = f(self) {
            *self = backup;
            return Err(e);
        }
        Ok(self)
    }

    /// Resolve the table for an attribute reference.
    ///
    /// An empty `table` is inferred when exactly one table is registered.
    /// With `create` unset, naming an unregistered table is an error.
    fn resolve_table(&self, table: &str, create: bool) -> Result<String> {
        if table.is_empty() {
            return match self.tables.len() {
                1 => Ok(self.tables.keys().next().cloned().unwrap_or_default()),
                _ => Err(Error::validation("Ambiguous table...table must be specified")),
            };
        }
        let table = table_ident(table)?;
        if !create && !self.tables.contains_key(&table) {
            return Err(Error::validation(format!(
                "The table specified does not exist: {table}"
            )));
        }
        Ok(table)
    }

    /// Parse `name` and resolve it to a qualified attribute name.
    fn resolve(&self, name: &str, create: bool) -> Result<AttributeName> {
        let attr = parse_attribute_name(name)?;
        let table = self.resolve_table(&attr.table, create)?;
        Ok(AttributeName::qualified(table, attr.name))
    }

    fn ensure_table(&mut self, table: &str) {
        if !self.tables.contains_key(table) {
            self.tables.insert(table.to_string(), IndexMap::new());
        }
    }

    // ==================== Tables ====================

    /// Register a table, clearing any attributes it already had.
    ///
    /// A blank name is ignored.
    pub fn set_table(&mut self, table: &str) -> Result<&mut Self> {
        if table.trim().is_empty() {
            return Ok(self);
        }
        let table = table_ident(table)?;
        self.tables.insert(table, IndexMap::new());
        Ok(self)
    }

    /// Replace the model with one holding exactly `tables`.
    ///
    /// All-or-nothing: on an invalid name the previous model is restored.
    pub fn set_tables<I, S>(&mut self, tables: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            m.clear();
            m.tables.clear();
            m.insert_returns.clear();
            for table in tables {
                m.set_table(table.as_ref())?;
            }
            Ok(())
        })
    }

    /// Remove a table with its attributes and every relationship, select,
    /// order, update and insert-return that references it.
    pub fn remove_table(&mut self, table: &str) -> &mut Self {
        let table = table.trim().to_ascii_lowercase();
        let prefix = format!("{table}.");
        self.tables.shift_remove(&table);
        self.relationships.retain(|r| !r.references(&table));
        self.selects.retain(|s| !s.starts_with(&prefix));
        self.order.retain(|k, _| !k.starts_with(&prefix));
        self.updates.retain(|k, _| !k.starts_with(&prefix));
        self.insert_returns.retain(|s| !s.starts_with(&prefix));
        self
    }

    /// Registered table names, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of registered tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.trim().to_ascii_lowercase())
    }

    /// Attributes of one table, in the order they were first set.
    pub fn table_attributes(&self, table: &str) -> Option<&IndexMap<String, Attribute>> {
        self.tables.get(table)
    }

    // ==================== Attributes ====================

    /// Set an attribute's value and comparator.
    ///
    /// `name` is `attr` or `table.attr`; a bare name needs exactly one table
    /// to be registered. A qualified name registers its table when missing.
    /// Setting an attribute again overwrites both value and comparator.
    pub fn set(
        &mut self,
        name: &str,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        self.put(attr, comparator, value.into());
        Ok(self)
    }

    fn put(&mut self, attr: AttributeName, comparator: Comparator, value: Value) {
        self.tables
            .entry(attr.table)
            .or_default()
            .insert(attr.name, Attribute { value, comparator });
    }

    /// Set an attribute compared with `=`.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set(name, Comparator::Eq, value)
    }

    /// Set an attribute from `"[table.]attr <comparator> <value>"`.
    pub fn set_attribute_str(&mut self, s: &str) -> Result<&mut Self> {
        let parsed = parse_attribute(s)?;
        let table = self.resolve_table(&parsed.name.table, true)?;
        self.put(
            AttributeName::qualified(table, parsed.name.name),
            parsed.comparator,
            parsed.value,
        );
        Ok(self)
    }

    /// Set several attribute strings; all-or-nothing.
    pub fn set_attributes<I, S>(&mut self, attributes: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            for a in attributes {
                m.set_attribute_str(a.as_ref())?;
            }
            Ok(())
        })
    }

    fn find(&self, name: &str) -> Result<Option<&Attribute>> {
        let attr = self.resolve(name, true)?;
        Ok(self.tables.get(&attr.table).and_then(|t| t.get(&attr.name)))
    }

    /// An attribute's value, if set.
    pub fn attribute(&self, name: &str) -> Result<Option<&Value>> {
        Ok(self.find(name)?.map(|a| &a.value))
    }

    /// Attribute values keyed by `table.attr` (or `attr` with `short_keys`,
    /// where later tables overwrite earlier ones on collisions).
    ///
    /// `table` limits the result to one table.
    pub fn attributes(&self, table: Option<&str>, short_keys: bool) -> IndexMap<String, Value> {
        self.scoped(table)
            .flat_map(|(t, attrs)| {
                attrs.iter().map(move |(name, a)| {
                    let key = if short_keys { name.clone() } else { format!("{t}.{name}") };
                    (key, a.value.clone())
                })
            })
            .collect()
    }

    /// Attribute names, in the same form as [`AttributeModel::attributes`].
    pub fn attribute_keys(&self, table: Option<&str>, short_keys: bool) -> Vec<String> {
        self.attributes(table, short_keys).into_keys().collect()
    }

    fn scoped<'a>(
        &'a self,
        table: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a String, &'a IndexMap<String, Attribute>)> + 'a {
        self.tables
            .iter()
            .filter(move |(t, _)| table.is_none_or(|s| t.as_str() == s.trim().to_ascii_lowercase()))
    }

    /// Unset an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        if let Some(attrs) = self.tables.get_mut(&attr.table) {
            attrs.shift_remove(&attr.name);
        }
        Ok(self)
    }

    /// Unset every attribute, or those of one table. Tables stay registered.
    pub fn clear_attributes(&mut self, table: Option<&str>) -> &mut Self {
        let table = table.map(|t| t.trim().to_ascii_lowercase());
        for (t, attrs) in self.tables.iter_mut() {
            if table.as_ref().is_none_or(|s| s == t) {
                attrs.clear();
            }
        }
        self
    }

    // ==================== Comparators ====================

    /// Change the comparator of an attribute that is already set.
    ///
    /// Does nothing when the attribute is not set.
    pub fn set_comparator(&mut self, name: &str, comparator: Comparator) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        if let Some(a) = self
            .tables
            .get_mut(&attr.table)
            .and_then(|t| t.get_mut(&attr.name))
        {
            a.comparator = comparator;
        }
        Ok(self)
    }

    /// An attribute's comparator, if set.
    pub fn comparator(&self, name: &str) -> Result<Option<Comparator>> {
        Ok(self.find(name)?.map(|a| a.comparator))
    }

    /// Comparators keyed by `table.attr`, optionally for one table.
    pub fn comparators(&self, table: Option<&str>) -> IndexMap<String, Comparator> {
        self.scoped(table)
            .flat_map(|(t, attrs)| {
                attrs
                    .iter()
                    .map(move |(name, a)| (format!("{t}.{name}"), a.comparator))
            })
            .collect()
    }

    /// Reset comparators back to `=`, optionally for one table.
    pub fn reset_comparators(&mut self, table: Option<&str>) -> &mut Self {
        let table = table.map(|t| t.trim().to_ascii_lowercase());
        for (t, attrs) in self.tables.iter_mut() {
            if table.as_ref().is_none_or(|s| s == t) {
                attrs.values_mut().for_each(|a| a.comparator = Comparator::Eq);
            }
        }
        self
    }

    // ==================== Ordering ====================

    /// Append (or redirect) an ORDER BY entry. The table must be registered.
    pub fn add_order(&mut self, name: &str, direction: Direction) -> Result<&mut Self> {
        let attr = self.resolve(name, false)?;
        self.order.insert(attr.to_string(), direction);
        Ok(self)
    }

    /// Replace the ordering with `"attr [ASC|DESC]"` entries; all-or-nothing.
    pub fn set_order<I, S>(&mut self, orders: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            m.order.clear();
            for o in orders {
                let (name, direction) = parse_order(o.as_ref())?;
                m.add_order(&name.to_string(), direction)?;
            }
            Ok(())
        })
    }

    /// Drop one ORDER BY entry.
    pub fn remove_order(&mut self, name: &str) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        self.order.shift_remove(&attr.to_string());
        Ok(self)
    }

    pub fn clear_order(&mut self) -> &mut Self {
        self.order.clear();
        self
    }

    /// ORDER BY entries keyed by `table.attr`, in insertion order.
    pub fn order(&self) -> &IndexMap<String, Direction> {
        &self.order
    }

    // ==================== Relationships ====================

    /// Add a join relationship between two qualified attributes.
    ///
    /// A trailing `+` on either name marks that side as outer. Missing tables
    /// are registered. Equivalent relationships are stored once.
    pub fn set_table_relationship(&mut self, left: &str, right: &str) -> Result<&mut Self> {
        let r = Relationship::parse(&format!("{left} = {right}"))?;
        self.add_relationship(r);
        Ok(self)
    }

    /// Add a relationship written as `"t1.a1[+] = t2.a2[+]"`.
    pub fn set_table_relationship_str(&mut self, s: &str) -> Result<&mut Self> {
        let r = Relationship::parse(s)?;
        self.add_relationship(r);
        Ok(self)
    }

    fn add_relationship(&mut self, r: Relationship) {
        self.ensure_table(&r.left().table);
        self.ensure_table(&r.right().table);
        if !self.relationships.contains(&r) {
            self.relationships.push(r);
        }
    }

    /// Replace all relationships; all-or-nothing.
    pub fn set_table_relationships<I, S>(&mut self, relationships: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            m.relationships.clear();
            for r in relationships {
                m.set_table_relationship_str(r.as_ref())?;
            }
            Ok(())
        })
    }

    pub fn table_relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn clear_table_relationships(&mut self) -> &mut Self {
        self.relationships.clear();
        self
    }

    // ==================== Selects ====================

    /// Add a column to the SELECT projection, registering its table if needed.
    pub fn add_select(&mut self, name: &str) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        self.ensure_table(&attr.table);
        let qualified = attr.to_string();
        if !self.selects.contains(&qualified) {
            self.selects.push(qualified);
        }
        Ok(self)
    }

    /// Append several projection columns; all-or-nothing.
    pub fn add_selects<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            for n in names {
                m.add_select(n.as_ref())?;
            }
            Ok(())
        })
    }

    /// Replace the projection; all-or-nothing.
    pub fn set_selects<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            m.selects.clear();
            for n in names {
                m.add_select(n.as_ref())?;
            }
            Ok(())
        })
    }

    /// Projection columns as `table.attr`.
    pub fn selects(&self) -> &[String] {
        &self.selects
    }

    pub fn clear_selects(&mut self) -> &mut Self {
        self.selects.clear();
        self
    }

    // ==================== Updates ====================

    /// Assign a new value for UPDATE statements. The table must be registered.
    pub fn set_update(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let attr = self.resolve(name, false)?;
        self.updates.insert(attr.to_string(), value.into());
        Ok(self)
    }

    /// Add `"attr = value"` assignments; all-or-nothing.
    pub fn set_updates<I, S>(&mut self, updates: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            for u in updates {
                let (name, value) = parse_update(u.as_ref())?;
                m.set_update(&name.to_string(), value)?;
            }
            Ok(())
        })
    }

    /// The pending assignment for one attribute.
    pub fn update(&self, name: &str) -> Result<Option<&Value>> {
        let attr = self.resolve(name, true)?;
        Ok(self.updates.get(&attr.to_string()))
    }

    /// Assignments keyed by `table.attr` (or `attr` with `short_keys`),
    /// optionally for one table.
    pub fn updates(&self, table: Option<&str>, short_keys: bool) -> IndexMap<String, Value> {
        let table = table.map(|t| t.trim().to_ascii_lowercase());
        self.updates
            .iter()
            .filter_map(|(key, value)| {
                let (t, name) = key.split_once('.')?;
                if table.as_ref().is_some_and(|s| s != t) {
                    return None;
                }
                let key = if short_keys { name.to_string() } else { key.clone() };
                Some((key, value.clone()))
            })
            .collect()
    }

    pub fn remove_update(&mut self, name: &str) -> Result<&mut Self> {
        let attr = self.resolve(name, true)?;
        self.updates.shift_remove(&attr.to_string());
        Ok(self)
    }

    pub fn clear_updates(&mut self) -> &mut Self {
        self.updates.clear();
        self
    }

    // ==================== Insert returns ====================

    /// Request a column back from INSERT / UPDATE / DELETE via `RETURNING`.
    /// The table must be registered.
    pub fn add_insert_return(&mut self, name: &str) -> Result<&mut Self> {
        let attr = self.resolve(name, false)?;
        let qualified = attr.to_string();
        if !self.insert_returns.contains(&qualified) {
            self.insert_returns.push(qualified);
        }
        Ok(self)
    }

    /// Replace the returned columns; all-or-nothing.
    pub fn set_insert_returns<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atomically(|m| {
            m.insert_returns.clear();
            for n in names {
                m.add_insert_return(n.as_ref())?;
            }
            Ok(())
        })
    }

    /// Returned columns as `table.attr`.
    pub fn insert_returns(&self) -> &[String] {
        &self.insert_returns
    }

    /// Returned column names (without table) belonging to `table`.
    pub fn insert_returns_for(&self, table: &str) -> Vec<&str> {
        self.insert_returns
            .iter()
            .filter_map(|s| s.split_once('.'))
            .filter(|(t, _)| *t == table)
            .map(|(_, name)| name)
            .collect()
    }

    pub fn clear_insert_returns(&mut self) -> &mut Self {
        self.insert_returns.clear();
        self
    }

    // ==================== Paging & matching ====================

    pub fn set_limit(&mut self, limit: Option<u64>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn set_offset(&mut self, offset: Option<u64>) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Whether LIKE comparisons are case-sensitive (default `true`).
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> &mut Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Reset attributes, relationships, order, selects and updates.
    ///
    /// Tables stay registered; limit, offset and insert returns are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.clear_attributes(None)
            .clear_table_relationships()
            .clear_order()
            .clear_selects()
            .clear_updates()
    }

    // ==================== Output ====================

    /// Attribute values as JSON: `{"table": {"attr": value}}`.
    pub fn to_json_value(&self) -> serde_json::Value {
        let tables = self
            .tables
            .iter()
            .map(|(t, attrs)| {
                let attrs = attrs
                    .iter()
                    .map(|(name, a)| (name.clone(), json_value(&a.value)))
                    .collect();
                (t.clone(), serde_json::Value::Object(attrs))
            })
            .collect();
        serde_json::Value::Object(tables)
    }

    /// [`AttributeModel::to_json_value`] rendered as a string.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Store a column read back from the database.
    ///
    /// Result columns come from the driver, so names are only lower-cased,
    /// not validated. A column that lands on an attribute already read from
    /// the same row is a Validation error.
    pub(crate) fn put_result_value(&mut self, table: &str, name: &str, value: Value) -> Result<()> {
        let attr = AttributeName::qualified(table.to_ascii_lowercase(), name.to_ascii_lowercase());
        let taken = self
            .tables
            .get(&attr.table)
            .is_some_and(|attrs| attrs.contains_key(&attr.name));
        if taken {
            return Err(Error::validation(format!(
                "Result column {attr} appears more than once; select the columns explicitly"
            )));
        }
        self.put(attr, Comparator::Eq, value);
        Ok(())
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int(v) => serde_json::Value::from(*v),
        Value::Float(v) => serde_json::Value::from(*v),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
    }
}

impl fmt::Display for AttributeModel {
    /// `{[t.a = 1, t.b > 2], [u.c *?* x]}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (table, attrs)) in self.tables.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("[")?;
            for (j, (name, a)) in attrs.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{table}.{name} {} {}", a.comparator, a.value)?;
            }
            f.write_str("]")?;
        }
        f.write_str("}")
    }
}
