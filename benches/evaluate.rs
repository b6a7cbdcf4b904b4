use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ruletree::{combine, parse, Node, Record};

/// A rule string of `n` comparisons joined by AND, cycling through the
/// default attributes, plus a record that satisfies it.
fn build_rule(n: usize) -> (String, Record) {
    let clauses: Vec<String> = (0..n)
        .map(|i| match i % 4 {
            0 => format!("age > {}", i % 30),
            1 => format!("salary < {}", 100_000 + i),
            2 => "department = Sales".to_owned(),
            _ => format!("experience > {}", i % 5),
        })
        .collect();
    let record = Record::new()
        .set("age", 40_i64)
        .set("salary", 60_000_i64)
        .set("department", "Sales")
        .set("experience", 10_i64);
    (clauses.join(" AND "), record)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &n in &[5, 20, 50] {
        let (rule, _) = build_rule(n);
        group.bench_function(format!("{n}_comparisons"), |b| {
            b.iter(|| parse(black_box(&rule)));
        });
    }

    let nested = "((age > 30 OR salary > 50000) AND experience > 5) OR (department = HR AND (age < 25 OR salary < 1000))";
    group.bench_function("nested_groups", |b| {
        b.iter(|| parse(black_box(nested)));
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_eval");

    for &n in &[5, 20, 50] {
        let (rule, record) = build_rule(n);
        let node = parse(&rule).unwrap();
        group.bench_function(format!("{n}_comparisons"), |b| {
            b.iter(|| node.evaluate(black_box(&record)));
        });
    }

    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");

    for &n in &[5, 20, 50] {
        let (rule, _) = build_rule(1);
        let nodes: Vec<Node> = (0..n).map(|_| parse(&rule).unwrap()).collect();
        group.bench_function(format!("{n}_trees"), |b| {
            b.iter(|| combine(black_box(nodes.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_combine);
criterion_main!(benches);
