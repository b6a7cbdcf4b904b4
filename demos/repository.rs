use serde_json::json;

use ruletree::{InMemoryRepository, Record, RuleEngine, RuleService};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let service = RuleService::new(RuleEngine::new(), InMemoryRepository::new());

    let adult = service
        .create("age > 18", json!({ "description": "adults only" }))
        .expect("failed to create rule");
    let sales = service
        .create(
            "department = Sales OR salary > 50000",
            json!({ "description": "sales staff or well paid", "owner": "hr" }),
        )
        .expect("failed to create rule");

    if let Err(err) = service.create("height > 180", json!({ "description": "tall" })) {
        println!("rejected: {err}");
    }
    if let Err(err) = service.create("age > 18", json!({})) {
        println!("rejected: {err}");
    }

    for stored in service.list().expect("failed to list rules") {
        println!(
            "{}: {} ({})",
            stored.record.id, stored.record.rule_string, stored.record.metadata.description()
        );
    }

    let combined = service
        .combine_ids(&[&adult.record.id, &sales.record.id])
        .expect("failed to combine rules")
        .expect("two ids given");
    println!("combined: {combined}");

    let record: Record =
        serde_json::from_value(json!({ "age": 19, "department": "Sales", "salary": 30000 }))
            .expect("failed to read record");
    println!("combined -> {}", combined.evaluate(&record));
    println!(
        "adult rule -> {}",
        service
            .evaluate_id(&adult.record.id, &record)
            .expect("rule exists")
    );

    service
        .delete(&sales.record.id)
        .expect("failed to delete rule");
    println!(
        "{} rule(s) left",
        service.list().expect("failed to list rules").len()
    );
}
