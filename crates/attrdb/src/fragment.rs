//! Parameterized SQL fragments.
//!
//! A [`QueryFragment`] grows a SQL string containing `?` placeholders next to
//! the ordered list of values bound to them. Placeholders are rendered per
//! backend only when the statement is executed (`$1, $2, ...` on PostgreSQL).
//!
//! # Example
//!
//! ```
//! use attrdb::fragment;
//!
//! let mut q = fragment("SELECT * FROM t WHERE id = ");
//! q.add_variable(5);
//!
//! assert_eq!(q.query(), "SELECT * FROM t WHERE id = ?");
//! assert_eq!(q.query_debug(), "SELECT * FROM t WHERE id = 5");
//! ```

use crate::backend::Backend;
use crate::value::{Bind, ParamType, Value};
use std::borrow::Cow;

/// Start building a SQL fragment.
pub fn fragment(initial_sql: impl Into<String>) -> QueryFragment {
    QueryFragment::new(initial_sql)
}

/// SQL text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct QueryFragment {
    sql: String,
    binds: Vec<Bind>,
}

impl QueryFragment {
    /// Create a fragment with an initial SQL string.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            sql: initial_sql.into(),
            binds: Vec::new(),
        }
    }

    /// Create an empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn add_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder bound to `value`, type inferred.
    pub fn add_variable(&mut self, value: impl Into<Value>) -> &mut Self {
        self.sql.push('?');
        self.binds.push(Bind::new(value.into()));
        self
    }

    /// Append a `?` placeholder bound to `value` with an explicit type.
    pub fn add_typed_variable(&mut self, value: impl Into<Value>, ty: ParamType) -> &mut Self {
        self.sql.push('?');
        self.binds.push(Bind::typed(value.into(), ty));
        self
    }

    /// Append comma-separated placeholders, one per value.
    pub fn add_variables<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.add_variable(v);
        }
        self
    }

    /// Bind values for placeholders already written with [`add_sql`].
    ///
    /// [`add_sql`]: QueryFragment::add_sql
    pub fn add_variables_no_placeholder<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.binds
            .extend(values.into_iter().map(|v| Bind::new(v.into())));
        self
    }

    /// Append another fragment, consuming it.
    pub fn append(&mut self, mut other: QueryFragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.binds.append(&mut other.binds);
        self
    }

    /// The SQL text with `?` placeholders.
    pub fn query(&self) -> &str {
        &self.sql
    }

    /// The SQL text with placeholders rendered for `backend`.
    pub fn query_for(&self, backend: Backend) -> Cow<'_, str> {
        match backend {
            Backend::Postgres => {
                let mut n = 0usize;
                Cow::Owned(replace_placeholders(&self.sql, |out| {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }))
            }
            Backend::MySql | Backend::Sqlite => Cow::Borrowed(&self.sql),
        }
    }

    /// The SQL text with each placeholder replaced by its bound value as a
    /// literal. For logging only; never execute it.
    pub fn query_debug(&self) -> String {
        let mut binds = self.binds.iter();
        replace_placeholders(&self.sql, |out| match binds.next() {
            Some(b) => out.push_str(&b.debug_literal()),
            None => out.push('?'),
        })
    }

    /// Bound parameters, in placeholder order.
    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }

    /// Bound values coerced to their bind types, ready for a driver.
    pub fn bind_values(&self) -> Vec<Value> {
        self.binds.iter().map(Bind::coerced).collect()
    }

    /// Number of `?` placeholders outside quoted literals and identifiers.
    pub fn placeholder_count(&self) -> usize {
        let mut n = 0;
        replace_placeholders(&self.sql, |_| n += 1);
        n
    }

    /// Whether the placeholder count matches the bind count.
    pub fn is_balanced(&self) -> bool {
        self.placeholder_count() == self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// The statement kind, from its leading keyword.
    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(&self.sql)
    }

    /// Whether the statement carries a `RETURNING` clause.
    pub fn has_returning(&self) -> bool {
        let mut outside = String::with_capacity(self.sql.len());
        scan_quotes(&self.sql, |c, quoted| outside.push(if quoted { ' ' } else { c }));
        outside
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|w| w.eq_ignore_ascii_case("RETURNING"))
    }
}

/// Copy `sql`, calling `placeholder` for every `?` outside quotes.
fn replace_placeholders(sql: &str, mut placeholder: impl FnMut(&mut String)) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    scan_quotes(sql, |c, quoted| {
        if c == '?' && !quoted {
            placeholder(&mut out);
        } else {
            out.push(c);
        }
    });
    out
}

/// Walk `sql`, flagging characters inside `'…'`, `"…"` and `` `…` ``
/// (quotes included).
fn scan_quotes(sql: &str, mut f: impl FnMut(char, bool)) {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                f(c, true);
                if c == q {
                    quote = None;
                }
            }
            None if matches!(c, '\'' | '"' | '`') => {
                quote = Some(c);
                f(c, true);
            }
            None => f(c, false),
        }
    }
}

/// Kind of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, transaction control and anything else
    Other,
}

impl QueryType {
    /// Detect the statement kind from its first keyword, skipping leading
    /// whitespace, comments and parentheses.
    pub fn from_sql(sql: &str) -> Self {
        let s = strip_sql_prefix(sql);
        [
            ("SELECT", QueryType::Select),
            ("INSERT", QueryType::Insert),
            ("UPDATE", QueryType::Update),
            ("DELETE", QueryType::Delete),
        ]
        .into_iter()
        .find(|(kw, _)| starts_with_keyword(s, kw))
        .map_or(QueryType::Other, |(_, ty)| ty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Select => "select",
            QueryType::Insert => "insert",
            QueryType::Update => "update",
            QueryType::Delete => "delete",
            QueryType::Other => "other",
        }
    }
}

fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--") {
            match rest.find('\n') {
                Some(pos) => s = &rest[pos + 1..],
                None => return "",
            }
        } else if let Some(rest) = s.strip_prefix("/*") {
            match rest.find("*/") {
                Some(pos) => s = &rest[pos + 2..],
                None => return "",
            }
        } else if let Some(rest) = s.strip_prefix('(') {
            s = rest;
        }
        if s == before {
            return s;
        }
    }
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    s.get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_substitutes_literals() {
        let mut q = fragment("SELECT * FROM t WHERE id = ");
        q.add_variable(5);
        assert_eq!(q.query(), "SELECT * FROM t WHERE id = ?");
        assert_eq!(q.query_debug(), "SELECT * FROM t WHERE id = 5");
    }

    #[test]
    fn debug_quotes_strings_and_nulls() {
        let mut q = fragment("UPDATE t SET a = ");
        q.add_variable("it's")
            .add_sql(", b = ")
            .add_variable(Value::Null)
            .add_sql(" WHERE c = ")
            .add_typed_variable(7, ParamType::Str);
        assert_eq!(
            q.query_debug(),
            "UPDATE t SET a = 'it''s', b = NULL WHERE c = '7'"
        );
    }

    #[test]
    fn debug_does_not_rescan_substituted_text() {
        let mut q = fragment("SELECT ");
        q.add_variable("?").add_sql(", ").add_variable(1);
        assert_eq!(q.query_debug(), "SELECT '?', 1");
    }

    #[test]
    fn variables_are_comma_joined_in_order() {
        let mut q = fragment("INSERT INTO t (a, b, c) VALUES (");
        q.add_variables([Value::from(1), Value::from("x"), Value::Null])
            .add_sql(")");
        assert_eq!(q.query(), "INSERT INTO t (a, b, c) VALUES (?, ?, ?)");
        assert_eq!(q.binds().len(), 3);
        assert_eq!(q.binds()[1].ty, ParamType::Str);
        assert!(q.is_balanced());
    }

    #[test]
    fn no_placeholder_binds_balance_raw_sql() {
        let mut q = fragment("UPDATE t SET a = ?, b = ?");
        assert!(!q.is_balanced());
        q.add_variables_no_placeholder([1, 2]);
        assert!(q.is_balanced());
    }

    #[test]
    fn append_concatenates_sql_and_binds() {
        let mut w = QueryFragment::empty();
        w.add_sql(" WHERE id = ").add_variable(42);

        let mut q = fragment("SELECT * FROM users");
        q.append(w);
        assert_eq!(q.query(), "SELECT * FROM users WHERE id = ?");
        assert_eq!(q.bind_values(), vec![Value::Int(42)]);
    }

    #[test]
    fn postgres_placeholders_are_numbered() {
        let mut q = fragment("SELECT * FROM t WHERE a = ");
        q.add_variable(1).add_sql(" AND b = ").add_variable(2);
        assert_eq!(q.query_for(Backend::Postgres), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(q.query_for(Backend::Sqlite), "SELECT * FROM t WHERE a = ? AND b = ?");
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        let q = fragment("SELECT '?' AS \"a?\", `b?` FROM t WHERE x = ?");
        assert_eq!(q.placeholder_count(), 1);
        assert_eq!(
            q.query_for(Backend::Postgres),
            "SELECT '?' AS \"a?\", `b?` FROM t WHERE x = $1"
        );
    }

    #[test]
    fn detects_query_type() {
        assert_eq!(QueryType::from_sql("  select 1"), QueryType::Select);
        assert_eq!(QueryType::from_sql("-- c\nINSERT INTO t"), QueryType::Insert);
        assert_eq!(QueryType::from_sql("/* x */ UPDATE t"), QueryType::Update);
        assert_eq!(QueryType::from_sql("(DELETE FROM t)"), QueryType::Delete);
        assert_eq!(QueryType::from_sql("BEGIN"), QueryType::Other);
    }

    #[test]
    fn detects_returning_outside_literals() {
        assert!(fragment("INSERT INTO t (a) VALUES (?) RETURNING id").has_returning());
        assert!(!fragment("INSERT INTO t (a) VALUES ('returning')").has_returning());
        assert!(!fragment("SELECT returning_x FROM t").has_returning());
    }
}
