//! Join relationships between two tables.

use crate::error::{Error, Result};
use crate::ident::AttributeName;
use crate::parse::{OUTER_JOIN_MARKER, parse_relationship_side};
use std::fmt;

/// The SQL join emitted for a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinType {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
        }
    }

    /// Join type from the outer-join markers of the side already in the FROM
    /// clause (`present_outer`) and the side being joined (`joined_outer`).
    pub(crate) fn from_markers(present_outer: bool, joined_outer: bool) -> Self {
        match (present_outer, joined_outer) {
            (false, false) => JoinType::Inner,
            (true, false) => JoinType::RightOuter,
            (false, true) => JoinType::LeftOuter,
            (true, true) => JoinType::FullOuter,
        }
    }
}

/// An equality join predicate `left = right` between two qualified attributes.
///
/// Sides are stored in canonical order (lexicographically smaller qualified
/// name on the left), so `a.x = b.y` and `b.y = a.x` are the same relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    left: AttributeName,
    left_outer: bool,
    right: AttributeName,
    right_outer: bool,
}

impl Relationship {
    pub(crate) fn new(
        left: AttributeName,
        left_outer: bool,
        right: AttributeName,
        right_outer: bool,
    ) -> Self {
        if left.to_string() > right.to_string() {
            Self {
                left: right,
                left_outer: right_outer,
                right: left,
                right_outer: left_outer,
            }
        } else {
            Self {
                left,
                left_outer,
                right,
                right_outer,
            }
        }
    }

    /// Parse `"t1.a1[+] = t2.a2[+]"`.
    pub fn parse(s: &str) -> Result<Self> {
        let (left, right) = s
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("Invalid table relationship specified: {s}")))?;
        let (left, left_outer) = parse_relationship_side(left, s)?;
        let (right, right_outer) = parse_relationship_side(right, s)?;
        // Tables carry no aliases, so a table cannot be joined to itself.
        if left.table == right.table {
            return Err(Error::validation(format!(
                "A table relationship must join two different tables: {s}"
            )));
        }
        Ok(Self::new(left, left_outer, right, right_outer))
    }

    pub fn left(&self) -> &AttributeName {
        &self.left
    }

    pub fn right(&self) -> &AttributeName {
        &self.right
    }

    pub fn left_outer(&self) -> bool {
        self.left_outer
    }

    pub fn right_outer(&self) -> bool {
        self.right_outer
    }

    /// Join type when the left table seeds the FROM clause.
    pub fn join_type(&self) -> JoinType {
        JoinType::from_markers(self.left_outer, self.right_outer)
    }

    /// The `ON` predicate, markers stripped.
    pub fn predicate(&self) -> String {
        format!("{} = {}", self.left, self.right)
    }

    /// Whether either side belongs to `table`.
    pub fn references(&self, table: &str) -> bool {
        self.left.table == table || self.right.table == table
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = |outer: bool| if outer { OUTER_JOIN_MARKER.to_string() } else { String::new() };
        write!(
            f,
            "{}{} = {}{}",
            self.left,
            marker(self.left_outer),
            self.right,
            marker(self.right_outer)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_input_independent() {
        let a = Relationship::parse("a.x = b.y").unwrap();
        let b = Relationship::parse("b.y = a.x").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "a.x = b.y");
        assert_eq!(b.to_string(), "a.x = b.y");
    }

    #[test]
    fn markers_follow_their_side() {
        let r = Relationship::parse("orders.user_id+ = users.id").unwrap();
        assert_eq!(r.to_string(), "orders.user_id+ = users.id");
        assert_eq!(r.join_type(), JoinType::RightOuter);

        let r = Relationship::parse("users.id = orders.user_id+").unwrap();
        assert_eq!(r.to_string(), "orders.user_id+ = users.id");
        assert_eq!(r.predicate(), "orders.user_id = users.id");
    }

    #[test]
    fn join_types_from_markers() {
        assert_eq!(Relationship::parse("a.x = b.y").unwrap().join_type(), JoinType::Inner);
        assert_eq!(Relationship::parse("a.x+ = b.y").unwrap().join_type(), JoinType::RightOuter);
        assert_eq!(Relationship::parse("a.x = b.y+").unwrap().join_type(), JoinType::LeftOuter);
        assert_eq!(Relationship::parse("a.x+ = b.y+").unwrap().join_type(), JoinType::FullOuter);
    }

    #[test]
    fn rejects_unqualified_or_malformed() {
        assert!(Relationship::parse("x = b.y").is_err());
        assert!(Relationship::parse("a.x b.y").is_err());
        assert!(Relationship::parse("a.x = b.1y").is_err());
    }

    #[test]
    fn self_join_is_rejected() {
        let err = Relationship::parse("emp.manager_id = emp.id").unwrap_err();
        assert!(err.is_validation());
    }
}
