use super::*;
use crate::parse::Direction;
use crate::value::ParamType;

fn model(tables: &[&str]) -> AttributeModel {
    AttributeModel::with_tables(tables.iter().copied()).unwrap()
}

#[test]
fn single_table_where_is_unqualified() {
    let mut m = model(&["users"]);
    m.set_attribute_str("users.age > 21").unwrap();

    let w = where_clause(&m, Some("users"));
    assert_eq!(w.query(), "WHERE age > ?");
    assert_eq!(w.binds().len(), 1);
    assert_eq!(w.binds()[0].value, Value::Int(21));
    assert_eq!(w.binds()[0].ty, ParamType::Int);
}

#[test]
fn contains_wraps_value() {
    let mut m = model(&["users"]);
    m.set_attribute_str("name *?* \"bob\"").unwrap();

    let w = where_clause(&m, Some("users"));
    assert_eq!(w.query(), "WHERE name LIKE ?");
    assert_eq!(w.bind_values(), vec![Value::from("%bob%")]);
}

#[test]
fn prefix_and_suffix_patterns() {
    let mut m = model(&["t"]);
    m.set("a", Comparator::StartsWith, "x").unwrap();
    m.set("b", Comparator::EndsWith, "y").unwrap();

    let w = where_clause(&m, None);
    assert_eq!(w.query(), "WHERE t.a LIKE ? AND t.b LIKE ?");
    assert_eq!(w.bind_values(), vec![Value::from("x%"), Value::from("%y")]);
}

#[test]
fn case_insensitive_like_uses_upper() {
    let mut m = model(&["users"]);
    m.set("name", Comparator::Contains, "Bob").unwrap();
    m.set_case_sensitive(false);

    let w = where_clause(&m, Some("users"));
    assert_eq!(w.query(), "WHERE UPPER(name) LIKE UPPER(?)");
    assert_eq!(w.bind_values(), vec![Value::from("%Bob%")]);
}

#[test]
fn case_flag_leaves_relational_comparators_alone() {
    let mut m = model(&["users"]);
    m.set_attribute("name", "Bob").unwrap();
    m.set_case_sensitive(false);
    assert_eq!(where_clause(&m, None).query(), "WHERE users.name = ?");
}

#[test]
fn empty_predicates_yield_no_where() {
    let m = model(&["users"]);
    assert!(where_clause(&m, None).is_empty());
    assert!(where_clause(&m, Some("users")).binds().is_empty());
}

#[test]
fn null_equality_uses_is_null() {
    let mut m = model(&["t"]);
    m.set_attribute("a", Value::Null).unwrap();
    m.set("b", Comparator::Ne, Value::Null).unwrap();
    let w = where_clause(&m, Some("t"));
    assert_eq!(w.query(), "WHERE a IS NULL AND b IS NOT NULL");
    assert!(w.binds().is_empty());
}

#[test]
fn like_against_null_uses_is_null() {
    let mut m = model(&["t"]);
    m.set("a", Comparator::Contains, Value::Null).unwrap();
    m.set("b", Comparator::StartsWith, Value::Null).unwrap();
    m.set_case_sensitive(false);
    let w = where_clause(&m, Some("t"));
    assert_eq!(w.query(), "WHERE a IS NULL AND b IS NULL");
    assert!(w.binds().is_empty());
}

#[test]
fn scoped_where_skips_other_tables() {
    let mut m = model(&["users", "orders"]);
    m.set_attribute("users.id", 1).unwrap();
    m.set_attribute("orders.total", 5).unwrap();
    assert_eq!(where_clause(&m, Some("orders")).query(), "WHERE total = ?");
    assert_eq!(
        where_clause(&m, None).query(),
        "WHERE users.id = ? AND orders.total = ?"
    );
}

#[test]
fn tables_without_relationships_are_comma_joined() {
    let m = model(&["a", "b"]);
    assert_eq!(from_clause(&m).unwrap(), "a, b");
    assert!(from_clause(&AttributeModel::new()).is_err());
}

#[test]
fn join_types_follow_markers() {
    let cases = [
        ("a.x = b.y", "a INNER JOIN b ON a.x = b.y"),
        ("a.x+ = b.y", "a RIGHT OUTER JOIN b ON a.x = b.y"),
        ("a.x = b.y+", "a LEFT OUTER JOIN b ON a.x = b.y"),
        ("a.x+ = b.y+", "a FULL OUTER JOIN b ON a.x = b.y"),
    ];
    for (rel, expected) in cases {
        let mut m = AttributeModel::new();
        m.set_table_relationship_str(rel).unwrap();
        assert_eq!(from_clause(&m).unwrap(), expected, "{rel}");
    }
}

#[test]
fn chained_joins_and_cross_join() {
    let mut m = model(&["audit"]);
    m.set_table_relationships(["orders.user_id = users.id", "items.order_id+ = orders.id"])
        .unwrap();
    // canonical order puts orders.user_id on the left, so orders seeds
    assert_eq!(
        from_clause(&m).unwrap(),
        "orders INNER JOIN users ON orders.user_id = users.id \
         LEFT OUTER JOIN items ON items.order_id = orders.id \
         CROSS JOIN audit"
    );
}

#[test]
fn cyclic_relationship_extends_on() {
    let mut m = AttributeModel::new();
    m.set_table_relationships(["a.x = b.x", "a.y = b.y"]).unwrap();
    assert_eq!(from_clause(&m).unwrap(), "a INNER JOIN b ON a.x = b.x AND a.y = b.y");
}

#[test]
fn self_relationship_is_refused() {
    let mut m = model(&["emp"]);
    assert!(
        m.set_table_relationship("emp.manager_id", "emp.id")
            .unwrap_err()
            .is_validation()
    );
    assert!(m.table_relationships().is_empty());
    assert_eq!(from_clause(&m).unwrap(), "emp");
}

#[test]
fn every_relationship_reaches_an_on_clause() {
    let mut m = model(&["d"]);
    m.set_table_relationships(["a.x = b.x", "b.y = c.y", "c.z = a.z", "d.w = a.w"])
        .unwrap();
    let from = from_clause(&m).unwrap();
    for r in m.table_relationships() {
        assert!(from.contains(&r.predicate()), "{r} missing from {from}");
    }
}

#[test]
fn order_keeps_insertion_order() {
    let mut m = model(&["users"]);
    m.add_order("name", Direction::Desc).unwrap();
    m.add_order("age", Direction::Asc).unwrap();
    assert_eq!(order_clause(&m), "ORDER BY users.name DESC, users.age ASC");
    assert_eq!(order_clause(&model(&["users"])), "");
}

#[test]
fn full_select() {
    let mut m = model(&["users"]);
    m.set_attribute("age", 21)
        .unwrap()
        .add_select("name")
        .unwrap()
        .add_order("name", Direction::Asc)
        .unwrap();
    m.set_limit(Some(10)).set_offset(Some(20));

    let q = select_statement(&m, Backend::Postgres).unwrap();
    assert_eq!(
        q.query(),
        "SELECT users.name AS \"users.name\" FROM users WHERE users.age = ? \
         ORDER BY users.name ASC LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        q.query_debug(),
        "SELECT users.name AS \"users.name\" FROM users WHERE users.age = 21 \
         ORDER BY users.name ASC LIMIT 10 OFFSET 20"
    );
}

#[test]
fn select_star_without_selects() {
    let m = model(&["users"]);
    assert_eq!(
        select_statement(&m, Backend::MySql).unwrap().query(),
        "SELECT * FROM users"
    );
}

#[test]
fn insert_per_table_with_returning() {
    let mut m = model(&["users", "orders", "empty"]);
    m.set_attribute("users.name", "bob").unwrap();
    m.set_attribute("orders.total", 5).unwrap();
    m.add_insert_return("orders.id").unwrap();

    let stmts = insert_statements(&m);
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0].1.query(), "INSERT INTO users (name) VALUES (?)");
    assert_eq!(
        stmts[1].1.query(),
        "INSERT INTO orders (total) VALUES (?) RETURNING id"
    );
}

#[test]
fn update_sets_then_filters() {
    let mut m = model(&["users"]);
    m.set_attribute("id", 7).unwrap();
    m.set_update("status", "active").unwrap();

    let stmts = update_statements(&m).unwrap();
    let q = &stmts[0].1;
    assert_eq!(q.query(), "UPDATE users SET status = ? WHERE id = ?");
    assert_eq!(q.query_debug(), "UPDATE users SET status = 'active' WHERE id = 7");
    assert!(q.is_balanced());
}

#[test]
fn update_requires_assignments() {
    let m = model(&["users"]);
    assert!(update_statements(&m).unwrap_err().is_validation());
}

#[test]
fn delete_requires_predicates() {
    let mut m = model(&["users"]);
    assert!(delete_statements(&m).unwrap_err().is_validation());

    m.set("age", Comparator::Lt, 18).unwrap();
    let stmts = delete_statements(&m).unwrap();
    assert_eq!(stmts[0].1.query(), "DELETE FROM users WHERE age < ?");
}
