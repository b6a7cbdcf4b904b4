use ruletree::{attr, combine, parse, ParseError, Record};

fn employee(age: i64, department: &str) -> Record {
    Record::new().set("age", age).set("department", department)
}

#[test]
fn and_of_two_comparisons() {
    let rule = parse("age > 30 AND department = Sales").unwrap();
    assert_eq!(rule, attr("age").gt(30).and(attr("department").eq("Sales")));
    assert!(rule.evaluate(&employee(35, "Sales")));
    assert!(!rule.evaluate(&employee(20, "Sales")));
}

#[test]
fn grouped_or_inside_and() {
    let rule = parse("(age > 30 OR salary > 50000) AND experience > 5").unwrap();
    let record = Record::new()
        .set("age", 25_i64)
        .set("salary", 60000_i64)
        .set("experience", 6_i64);
    assert!(rule.evaluate(&record));

    let junior = record.clone().set("experience", 2_i64);
    assert!(!rule.evaluate(&junior));
}

#[test]
fn unclosed_group_after_and() {
    assert_eq!(
        parse("age > 30 AND ("),
        Err(ParseError::MismatchedParentheses)
    );
}

#[test]
fn unknown_attribute() {
    assert_eq!(
        parse("height > 180"),
        Err(ParseError::InvalidAttribute("height".into()))
    );
}

#[test]
fn doubled_comparator() {
    assert_eq!(
        parse("age >> 30"),
        Err(ParseError::InvalidOperator(">>".into()))
    );
    assert_eq!(
        parse("age >= 30"),
        Err(ParseError::InvalidOperator(">=".into()))
    );
}

#[test]
fn combined_rules_require_both() {
    let combined = combine([
        parse("age > 18").unwrap(),
        parse("department = Sales").unwrap(),
    ])
    .unwrap();
    assert!(combined.evaluate(&employee(19, "Sales")));
    assert!(!combined.evaluate(&employee(17, "Sales")));
}

#[test]
fn equal_precedence_folds_left() {
    // (age > 40 AND salary > 1) OR department = Sales
    let rule = parse("age > 40 AND salary > 1 OR department = Sales").unwrap();
    let record = Record::new().set("age", 20_i64).set("department", "Sales");
    assert!(rule.evaluate(&record));

    // age > 40 AND (salary > 1 OR department = Sales)
    let grouped = parse("age > 40 AND (salary > 1 OR department = Sales)").unwrap();
    assert!(!grouped.evaluate(&record));
}

#[test]
fn json_shape_matches_storage_format() {
    let rule = parse("age > 30 AND department = Sales").unwrap();
    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "operator",
            "value": "AND",
            "left": {
                "type": "operand",
                "left": null,
                "right": null,
                "value": { "left": "age", "operator": ">", "right": "30" }
            },
            "right": {
                "type": "operand",
                "left": null,
                "right": null,
                "value": { "left": "department", "operator": "=", "right": "Sales" }
            }
        })
    );
}

#[test]
fn display_is_fully_parenthesized() {
    let rule = parse("age > 1 AND salary > 2 OR experience > 3").unwrap();
    assert_eq!(
        rule.to_string(),
        "((age > 1 AND salary > 2) OR experience > 3)"
    );
    assert_eq!(rule.to_string().parse::<ruletree::Node>().unwrap(), rule);
}
