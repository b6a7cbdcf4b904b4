use ruletree::{combine, parse, Record};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let senior = parse("age > 30 AND department = Sales").expect("failed to parse rule");
    let experienced =
        parse("(age > 30 OR salary > 50000) AND experience > 5").expect("failed to parse rule");

    println!("rule 1: {senior}");
    println!("rule 2: {experienced}");

    let record = Record::new()
        .set("age", 35_i64)
        .set("department", "Sales")
        .set("salary", 60000_i64)
        .set("experience", 6_i64);

    println!("rule 1 -> {}", senior.evaluate(&record));
    println!("rule 2 -> {}", experienced.evaluate(&record));

    let combined = combine([senior, experienced]).expect("at least one rule");
    println!("combined: {combined}");
    println!("combined -> {}", combined.evaluate(&record));

    println!(
        "{}",
        serde_json::to_string_pretty(&combined).expect("failed to serialize tree")
    );

    match parse("age >> 30") {
        Ok(node) => println!("unexpectedly parsed: {node}"),
        Err(err) => println!("rejected: {err}"),
    }
}
