//! Attribute comparators.
//!
//! The comparator set is closed: six relational operators plus three LIKE
//! pattern shorthands where `?` stands for the value and `*` for a wildcard.
//!
//! | token | SQL            | bound value |
//! |-------|----------------|-------------|
//! | `=`   | `a = ?`        | value       |
//! | `!=`  | `a != ?`       | value       |
//! | `>`   | `a > ?`        | value       |
//! | `<`   | `a < ?`        | value       |
//! | `>=`  | `a >= ?`       | value       |
//! | `<=`  | `a <= ?`       | value       |
//! | `*?*` | `a LIKE ?`     | `%value%`   |
//! | `*?`  | `a LIKE ?`     | `%value`    |
//! | `?*`  | `a LIKE ?`     | `value%`    |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparator applied to an attribute in a WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Comparator {
    /// `=`
    #[default]
    #[serde(rename = "=")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `>=`
    #[serde(rename = ">=")]
    Gte,
    /// `<=`
    #[serde(rename = "<=")]
    Lte,
    /// `*?*`: value appears anywhere
    #[serde(rename = "*?*")]
    Contains,
    /// `*?`: value ends the text
    #[serde(rename = "*?")]
    EndsWith,
    /// `?*`: value starts the text
    #[serde(rename = "?*")]
    StartsWith,
}

impl Comparator {
    /// Every comparator, multi-character tokens ahead of their one-character
    /// prefixes so a left-to-right scan matches the longest token first.
    pub const ALL: [Comparator; 9] = [
        Comparator::Ne,
        Comparator::Gte,
        Comparator::Lte,
        Comparator::Contains,
        Comparator::EndsWith,
        Comparator::StartsWith,
        Comparator::Eq,
        Comparator::Gt,
        Comparator::Lt,
    ];

    /// The comparator's token as written in attribute strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Gte => ">=",
            Comparator::Lte => "<=",
            Comparator::Contains => "*?*",
            Comparator::EndsWith => "*?",
            Comparator::StartsWith => "?*",
        }
    }

    /// Whether this comparator compiles to a LIKE predicate.
    pub fn is_like(self) -> bool {
        matches!(
            self,
            Comparator::Contains | Comparator::EndsWith | Comparator::StartsWith
        )
    }

    /// The SQL operator for relational comparators; `LIKE` for patterns.
    pub fn sql_operator(self) -> &'static str {
        if self.is_like() { "LIKE" } else { self.as_str() }
    }

    /// Wrap `value` in `%` wildcards according to the pattern kind.
    ///
    /// Relational comparators return the value unchanged.
    pub fn like_pattern(self, value: &str) -> String {
        match self {
            Comparator::Contains => format!("%{value}%"),
            Comparator::EndsWith => format!("%{value}"),
            Comparator::StartsWith => format!("{value}%"),
            _ => value.to_string(),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Comparator::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Invalid comparator specified: {s}")))
    }
}

/// Check whether `s` is one of the comparator tokens.
pub fn is_valid_comparator(s: &str) -> bool {
    s.parse::<Comparator>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_token_is_valid() {
        for token in ["=", "!=", ">", "<", ">=", "<=", "*?*", "*?", "?*"] {
            assert!(is_valid_comparator(token), "{token}");
            assert_eq!(token.parse::<Comparator>().unwrap().as_str(), token);
        }
    }

    #[test]
    fn other_strings_are_invalid() {
        for token in ["", "==", "<>", "LIKE", "*", "?", "**", " =", "=>", "!"] {
            assert!(!is_valid_comparator(token), "{token:?}");
        }
    }

    #[test]
    fn like_patterns_wrap_value() {
        assert_eq!(Comparator::Contains.like_pattern("bob"), "%bob%");
        assert_eq!(Comparator::EndsWith.like_pattern("bob"), "%bob");
        assert_eq!(Comparator::StartsWith.like_pattern("bob"), "bob%");
        assert_eq!(Comparator::Eq.like_pattern("bob"), "bob");
    }

    #[test]
    fn sql_operator() {
        assert_eq!(Comparator::Gte.sql_operator(), ">=");
        assert_eq!(Comparator::Contains.sql_operator(), "LIKE");
        assert_eq!(Comparator::default(), Comparator::Eq);
    }
}
