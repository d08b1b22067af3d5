//! Table and attribute identifiers.
//!
//! Identifiers are unquoted SQL names matching `[A-Za-z_][A-Za-z0-9_]*`, at most
//! [`MAX_IDENTIFIER_LEN`] bytes long. They are folded to lower case on entry so
//! `Users.ID` and `users.id` name the same column.
//!
//! # Example
//! ```
//! use attrdb::parse_attribute_name;
//!
//! let attr = parse_attribute_name("users.age")?;
//! assert_eq!(attr.table, "users");
//! assert_eq!(attr.name, "age");
//!
//! let bare = parse_attribute_name("age")?;
//! assert_eq!(bare.table, "");
//! # Ok::<(), attrdb::Error>(())
//! ```

use crate::error::{Error, Result};
use std::fmt;

/// Longest accepted identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Check whether `s` is a valid unquoted identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Trim, validate and lower-case a table name.
pub(crate) fn table_ident(s: &str) -> Result<String> {
    let s = s.trim();
    if !is_valid_identifier(s) {
        return Err(Error::validation(format!("Invalid table name specified: {s}")));
    }
    Ok(s.to_ascii_lowercase())
}

/// Trim, validate and lower-case an attribute name.
pub(crate) fn attribute_ident(s: &str) -> Result<String> {
    let s = s.trim();
    if !is_valid_identifier(s) {
        return Err(Error::validation(format!(
            "Invalid attribute name specified: {s}"
        )));
    }
    Ok(s.to_ascii_lowercase())
}

/// A standalone (`age`) or fully-qualified (`users.age`) attribute name.
///
/// `table` is empty for standalone names; the model infers it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeName {
    pub table: String,
    pub name: String,
}

impl AttributeName {
    /// Build a qualified name from already-validated parts.
    pub(crate) fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Whether a table part is present.
    pub fn is_qualified(&self) -> bool {
        !self.table.is_empty()
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.table.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.table, self.name)
        }
    }
}

/// Parse a standalone or fully-qualified attribute name.
///
/// Splits on the first `.`; without one the table part is empty. Both parts
/// must be valid identifiers.
pub fn parse_attribute_name(s: &str) -> Result<AttributeName> {
    match s.split_once('.') {
        Some((table, name)) => Ok(AttributeName {
            table: table_ident(table)?,
            name: attribute_ident(name)?,
        }),
        None => Ok(AttributeName {
            table: String::new(),
            name: attribute_ident(s)?,
        }),
    }
}
