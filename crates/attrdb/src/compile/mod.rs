//! Clause compilation from an [`AttributeModel`].
//!
//! These are pure functions of the model: no I/O, no mutation. The engine
//! stitches their output into complete statements.

#[cfg(test)]
mod tests;

use crate::backend::Backend;
use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::fragment::QueryFragment;
use crate::model::{AttributeModel, JoinType, Relationship};
use crate::value::Value;

struct Join {
    table: String,
    kind: JoinType,
    on: Vec<String>,
}

/// The table expression following `FROM`.
///
/// Without relationships the tables are comma-joined. Otherwise the first
/// relationship's left table seeds the clause and every relationship
/// contributes a `JOIN … ON …` for the side not yet present; relationships
/// between two tables already present extend the latest `ON`. Tables no
/// relationship reaches are appended with `CROSS JOIN`.
pub fn from_clause(model: &AttributeModel) -> Result<String> {
    let tables: Vec<&str> = model.tables().collect();
    if tables.is_empty() {
        return Err(Error::validation("At least one table must be specified"));
    }

    let relationships = model.table_relationships();
    let Some(first) = relationships.first() else {
        return Ok(tables.join(", "));
    };

    let seed = first.left().table.clone();
    let mut present = vec![seed.clone()];
    let mut joins: Vec<Join> = Vec::new();
    let mut pending: Vec<&Relationship> = relationships.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        let mut unplaced = Vec::with_capacity(before);
        for r in pending {
            if !place(r, &mut present, &mut joins)? {
                unplaced.push(r);
            }
        }
        pending = unplaced;
        if pending.len() == before {
            // Disconnected group: bring in one of its tables unconditionally.
            let table = pending[0].left().table.clone();
            present.push(table.clone());
            joins.push(Join {
                table,
                kind: JoinType::Inner,
                on: Vec::new(),
            });
        }
    }

    for t in tables {
        if !present.iter().any(|p| p == t) {
            present.push(t.to_string());
            joins.push(Join {
                table: t.to_string(),
                kind: JoinType::Inner,
                on: Vec::new(),
            });
        }
    }

    let mut out = seed;
    for j in joins {
        if j.on.is_empty() {
            out.push_str(" CROSS JOIN ");
            out.push_str(&j.table);
        } else {
            out.push(' ');
            out.push_str(j.kind.as_sql());
            out.push(' ');
            out.push_str(&j.table);
            out.push_str(" ON ");
            out.push_str(&j.on.join(" AND "));
        }
    }
    Ok(out)
}

/// Place one relationship if either side is already present.
///
/// Returns `false` when neither side is present yet. A relationship between
/// two present tables extends the `ON` of whichever joined last.
fn place(r: &Relationship, present: &mut Vec<String>, joins: &mut Vec<Join>) -> Result<bool> {
    let left_in = present.contains(&r.left().table);
    let right_in = present.contains(&r.right().table);
    let (table, kind) = match (left_in, right_in) {
        (false, false) => return Ok(false),
        (true, true) => {
            // present[0] is the seed; joined tables follow in order.
            let latest = present
                .iter()
                .rposition(|t| *t == r.left().table || *t == r.right().table)
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| joins.get_mut(i));
            return match latest {
                Some(j) => {
                    j.on.push(r.predicate());
                    Ok(true)
                }
                None => Err(Error::validation(format!(
                    "Cannot place table relationship: {r}"
                ))),
            };
        }
        (true, false) => (
            r.right().table.clone(),
            JoinType::from_markers(r.left_outer(), r.right_outer()),
        ),
        (false, true) => (
            r.left().table.clone(),
            JoinType::from_markers(r.right_outer(), r.left_outer()),
        ),
    };
    present.push(table.clone());
    joins.push(Join {
        table,
        kind,
        on: vec![r.predicate()],
    });
    Ok(true)
}

/// A parameterized `WHERE` clause over the model's attributes.
///
/// With `table` set only that table's attributes are compiled and names are
/// left unqualified (UPDATE / DELETE); otherwise every table's attributes are
/// compiled with qualified names. No attributes yields an empty fragment.
pub fn where_clause(model: &AttributeModel, table: Option<&str>) -> QueryFragment {
    let mut q = QueryFragment::empty();
    let mut first = true;

    for t in model.tables() {
        if table.is_some_and(|s| s != t) {
            continue;
        }
        let Some(attrs) = model.table_attributes(t) else {
            continue;
        };
        for (name, attr) in attrs {
            q.add_sql(if first { "WHERE " } else { " AND " });
            first = false;

            let column = match table {
                Some(_) => name.clone(),
                None => format!("{t}.{name}"),
            };
            predicate(
                &mut q,
                &column,
                attr.comparator,
                &attr.value,
                model.case_sensitive(),
            );
        }
    }
    q
}

fn predicate(
    q: &mut QueryFragment,
    column: &str,
    comparator: Comparator,
    value: &Value,
    case_sensitive: bool,
) {
    match (comparator, value) {
        (Comparator::Eq, Value::Null) => {
            q.add_sql(&format!("{column} IS NULL"));
        }
        (Comparator::Ne, Value::Null) => {
            q.add_sql(&format!("{column} IS NOT NULL"));
        }
        // A pattern built from NULL would match the text "NULL".
        (c, Value::Null) if c.is_like() => {
            q.add_sql(&format!("{column} IS NULL"));
        }
        (c, v) if c.is_like() => {
            let pattern = c.like_pattern(&v.to_text());
            if case_sensitive {
                q.add_sql(&format!("{column} LIKE ")).add_variable(pattern);
            } else {
                q.add_sql(&format!("UPPER({column}) LIKE UPPER("))
                    .add_variable(pattern)
                    .add_sql(")");
            }
        }
        (c, v) => {
            q.add_sql(&format!("{column} {} ", c.sql_operator()))
                .add_variable(v.clone());
        }
    }
}

/// `ORDER BY` over the model's order entries, or an empty string.
pub fn order_clause(model: &AttributeModel) -> String {
    let order = model.order();
    if order.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = order.iter().map(|(k, d)| format!("{k} {d}")).collect();
    format!("ORDER BY {}", entries.join(", "))
}

/// `LIMIT` / `OFFSET` as numeric literals, or an empty string.
pub fn paging_clause(model: &AttributeModel) -> String {
    match (model.limit(), model.offset()) {
        (Some(l), Some(o)) => format!("LIMIT {l} OFFSET {o}"),
        (Some(l), None) => format!("LIMIT {l}"),
        (None, Some(o)) => format!("OFFSET {o}"),
        (None, None) => String::new(),
    }
}

/// The projection list: `*`, or each select aliased to its qualified name.
pub fn select_list(model: &AttributeModel, backend: Backend) -> String {
    if model.selects().is_empty() {
        return "*".to_string();
    }
    model
        .selects()
        .iter()
        .map(|s| format!("{s} AS {}", backend.quote_alias(s)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A complete SELECT statement for `model`.
pub fn select_statement(model: &AttributeModel, backend: Backend) -> Result<QueryFragment> {
    let mut q = QueryFragment::new(format!(
        "SELECT {} FROM {}",
        select_list(model, backend),
        from_clause(model)?
    ));
    let filter = where_clause(model, None);
    if !filter.is_empty() {
        q.add_sql(" ").append(filter);
    }
    for clause in [order_clause(model), paging_clause(model)] {
        if !clause.is_empty() {
            q.add_sql(" ").add_sql(&clause);
        }
    }
    Ok(q)
}

/// `RETURNING` over `columns`, or an empty string.
pub fn returning_clause(columns: &[&str]) -> String {
    if columns.is_empty() {
        String::new()
    } else {
        format!(" RETURNING {}", columns.join(", "))
    }
}

/// One INSERT per table that has attributes, in table order.
pub fn insert_statements(model: &AttributeModel) -> Vec<(String, QueryFragment)> {
    model
        .tables()
        .filter_map(|t| {
            let attrs = model.attributes(Some(t), true);
            if attrs.is_empty() {
                return None;
            }
            let columns: Vec<&str> = attrs.keys().map(String::as_str).collect();
            let mut q = QueryFragment::new(format!(
                "INSERT INTO {t} ({}) VALUES (",
                columns.join(", ")
            ));
            q.add_variables(attrs.values().cloned()).add_sql(")");
            q.add_sql(&returning_clause(&model.insert_returns_for(t)));
            Some((t.to_string(), q))
        })
        .collect()
}

/// One UPDATE per table that has assignments, in table order.
///
/// The table's attributes become the WHERE predicate.
pub fn update_statements(model: &AttributeModel) -> Result<Vec<(String, QueryFragment)>> {
    let statements: Vec<_> = model
        .tables()
        .filter_map(|t| {
            let updates = model.updates(Some(t), true);
            if updates.is_empty() {
                return None;
            }
            let assignments: Vec<String> = updates.keys().map(|k| format!("{k} = ?")).collect();
            let mut q = QueryFragment::new(format!("UPDATE {t} SET {}", assignments.join(", ")));
            q.add_variables_no_placeholder(updates.into_values());

            let filter = where_clause(model, Some(t));
            if !filter.is_empty() {
                q.add_sql(" ").append(filter);
            }
            q.add_sql(&returning_clause(&model.insert_returns_for(t)));
            Some((t.to_string(), q))
        })
        .collect();

    if statements.is_empty() {
        return Err(Error::validation("No updates specified"));
    }
    Ok(statements)
}

/// One DELETE per table, in table order.
///
/// Every table must carry at least one attribute to filter on.
pub fn delete_statements(model: &AttributeModel) -> Result<Vec<(String, QueryFragment)>> {
    let tables: Vec<&str> = model.tables().collect();
    if tables.is_empty() {
        return Err(Error::validation("At least one table must be specified"));
    }
    tables
        .into_iter()
        .map(|t| {
            let filter = where_clause(model, Some(t));
            if filter.is_empty() {
                return Err(Error::validation(format!(
                    "DELETE requires at least one attribute to filter on: {t}"
                )));
            }
            let mut q = QueryFragment::new(format!("DELETE FROM {t} "));
            q.append(filter);
            q.add_sql(&returning_clause(&model.insert_returns_for(t)));
            Ok((t.to_string(), q))
        })
        .collect()
}
