use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};
use storagelens::store::diff;

/// Fixture generator for storage-shaped trees
mod fixtures {
    use super::*;

    /// `keys` entries, values are small JSON documents stored as strings
    pub fn key_value_tree(keys: usize, revision: usize) -> Value {
        let mut map = Map::new();
        for i in 0..keys {
            let value = json!({"id": i, "rev": if i % 10 == 0 { revision } else { 0 }}).to_string();
            map.insert(format!("key-{i}"), Value::String(value));
        }
        Value::Object(map)
    }

    /// databases holding one object store of `records` records each
    pub fn database_tree(databases: usize, records: usize, revision: usize) -> Value {
        let mut map = Map::new();
        for d in 0..databases {
            let rows: Vec<Value> = (0..records)
                .map(|r| json!({"id": r, "payload": format!("row-{r}"), "rev": if d == 0 { revision } else { 0 }}))
                .collect();
            map.insert(format!("db-{d}"), json!({ "items": rows }));
        }
        Value::Object(map)
    }
}

fn bench_key_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_value_diff");

    for keys in [100, 1_000, 10_000] {
        let left = fixtures::key_value_tree(keys, 1);
        let right = fixtures::key_value_tree(keys, 2);

        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| diff::diff(black_box(Some(&left)), black_box(&right)))
        });
    }

    group.finish();
}

fn bench_initial(c: &mut Criterion) {
    let right = fixtures::key_value_tree(1_000, 1);
    c.bench_function("initial_diff_1000", |b| {
        b.iter(|| diff::diff(black_box(None), black_box(&right)))
    });
}

fn bench_structured(c: &mut Criterion) {
    let mut group = c.benchmark_group("structured_diff");

    for records in [10, 1_000] {
        let left = fixtures::database_tree(20, records, 1);
        let right = fixtures::database_tree(20, records, 2);

        group.bench_with_input(BenchmarkId::from_parameter(records), &records, |b, _| {
            b.iter(|| diff::diff(black_box(Some(&left)), black_box(&right)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_value, bench_initial, bench_structured);
criterion_main!(benches);
