//! String forms of attribute expressions.
//!
//! These are convenience parsers layered over the typed
//! [`AttributeModel`](crate::AttributeModel) setters:
//!
//! - attributes: `users.age >= 21`, `name *?* "bob"`
//! - orders: `users.name DESC`
//! - updates: `users.status = active`
//! - relationships: `users.id = orders.user_id+` (`+` marks an outer side)

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::ident::{AttributeName, parse_attribute_name};
use crate::value::Value;

/// Outer-join marker appended to an attribute name in a relationship.
pub const OUTER_JOIN_MARKER: char = '+';

/// A parsed `<name> <comparator> <value>` string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttribute {
    pub name: AttributeName,
    pub comparator: Comparator,
    pub value: Value,
}

/// Locate the first comparator token in `s`, longest match first.
fn find_comparator(s: &str) -> Option<(usize, Comparator)> {
    s.char_indices().find_map(|(i, _)| {
        let rest = &s[i..];
        Comparator::ALL
            .into_iter()
            .find(|c| rest.starts_with(c.as_str()))
            .map(|c| (i, c))
    })
}

/// Parse `"<name> <comparator> <value>"`.
///
/// The string is split at the first comparator token; everything after it is
/// the value. Both sides must be non-empty.
pub fn parse_attribute(s: &str) -> Result<ParsedAttribute> {
    let invalid = || Error::validation(format!("Invalid attribute string specified: {s}"));

    let (idx, comparator) = find_comparator(s).ok_or_else(invalid)?;
    let name = s[..idx].trim();
    let value = s[idx + comparator.as_str().len()..].trim();
    if name.is_empty() || value.is_empty() {
        return Err(invalid());
    }

    Ok(ParsedAttribute {
        name: parse_attribute_name(name)?,
        comparator,
        value: Value::from_literal(value),
    })
}

/// Sort direction for ORDER BY entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    /// `ASC` or `DESC`; an empty string means `ASC`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(Error::validation(format!(
                "Invalid order direction specified: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `"<name> [ASC|DESC]"`.
pub fn parse_order(s: &str) -> Result<(AttributeName, Direction)> {
    let s = s.trim();
    let (name, direction) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
    Ok((parse_attribute_name(name)?, direction.parse()?))
}

/// Parse `"<name> = <value>"` as used for UPDATE assignments.
pub fn parse_update(s: &str) -> Result<(AttributeName, Value)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| Error::validation(format!("Invalid update specified: {s}")))?;
    Ok((parse_attribute_name(name)?, Value::from_literal(value)))
}

/// One side of a relationship: a qualified attribute and its outer-join flag.
pub(crate) fn parse_relationship_side(s: &str, whole: &str) -> Result<(AttributeName, bool)> {
    let s = s.trim();
    let (s, outer) = match s.strip_suffix(OUTER_JOIN_MARKER) {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };
    let invalid = || Error::validation(format!("Invalid table relationship specified: {whole}"));
    let name = parse_attribute_name(s).map_err(|_| invalid())?;
    if !name.is_qualified() {
        return Err(invalid());
    }
    Ok((name, outer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relational_attribute() {
        let a = parse_attribute("users.age > 21").unwrap();
        assert_eq!(a.name.table, "users");
        assert_eq!(a.name.name, "age");
        assert_eq!(a.comparator, Comparator::Gt);
        assert_eq!(a.value, Value::Int(21));
    }

    #[test]
    fn multi_char_comparators_win() {
        assert_eq!(parse_attribute("a >= 1").unwrap().comparator, Comparator::Gte);
        assert_eq!(parse_attribute("a <= 1").unwrap().comparator, Comparator::Lte);
        assert_eq!(parse_attribute("a != 1").unwrap().comparator, Comparator::Ne);
        assert_eq!(parse_attribute("a *?* x").unwrap().comparator, Comparator::Contains);
        assert_eq!(parse_attribute("a *? x").unwrap().comparator, Comparator::EndsWith);
        assert_eq!(parse_attribute("a ?* x").unwrap().comparator, Comparator::StartsWith);
    }

    #[test]
    fn spaces_around_comparator_are_optional() {
        let a = parse_attribute("name*?*\"bob\"").unwrap();
        assert_eq!(a.comparator, Comparator::Contains);
        assert_eq!(a.value, Value::Text("bob".into()));
    }

    #[test]
    fn value_may_contain_comparator_chars() {
        let a = parse_attribute("expr = a=b").unwrap();
        assert_eq!(a.comparator, Comparator::Eq);
        assert_eq!(a.value, Value::Text("a=b".into()));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_attribute("age").is_err());
        assert!(parse_attribute("age >").is_err());
        assert!(parse_attribute("> 5").is_err());
        assert!(parse_attribute("bad name = 5").is_err());
    }

    #[test]
    fn parses_order() {
        let (name, dir) = parse_order("users.name DESC").unwrap();
        assert_eq!(name.to_string(), "users.name");
        assert_eq!(dir, Direction::Desc);

        let (_, dir) = parse_order("name").unwrap();
        assert_eq!(dir, Direction::Asc);

        assert!(parse_order("name sideways").is_err());
    }

    #[test]
    fn parses_update() {
        let (name, value) = parse_update("users.status = 'active'").unwrap();
        assert_eq!(name.to_string(), "users.status");
        assert_eq!(value, Value::Text("active".into()));
        assert!(parse_update("status").is_err());
    }

    #[test]
    fn relationship_side_marker() {
        let (name, outer) = parse_relationship_side(" orders.user_id+ ", "x").unwrap();
        assert_eq!(name.to_string(), "orders.user_id");
        assert!(outer);

        assert!(parse_relationship_side("user_id", "x").is_err());
    }
}
