use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use specwatch_core::spec::{diff, identical_after_normalizing, split, to_canonical_string};

fn generate_document(num_paths: usize) -> Value {
    let mut paths = serde_json::Map::new();
    for i in 0..num_paths {
        paths.insert(
            format!("/v1/resource_{}/{{id}}", i),
            json!({
                "get": {
                    "operationId": format!("getResource{}", i),
                    "responses": {
                        "200": {
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Resource"}}}
                        }
                    }
                },
                "post": {
                    "operationId": format!("createResource{}", i),
                    "requestBody": {
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Create"}}}
                    },
                    "x-internal": true
                }
            }),
        );
    }

    json!({
        "openapi": "3.1.0",
        "paths": paths,
        "components": {
            "schemas": {
                "Resource": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "created": {"type": "integer", "example": 1700000000},
                        "owner": {"$ref": "#/components/schemas/Owner"}
                    }
                },
                "Owner": {"type": "object", "properties": {"name": {"type": "string"}}},
                "Create": {"type": "object", "properties": {"name": {"type": "string"}}}
            }
        }
    })
}

fn generate_schema(num_props: usize, variant: usize) -> Value {
    let mut props = serde_json::Map::new();
    for i in 0..num_props {
        let ty = if i % 7 == variant { "string" } else { "integer" };
        props.insert(format!("field_{}", i), json!({"type": ty, "description": "d"}));
    }
    json!({"type": "object", "properties": props, "required": ["field_0"]})
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for size in [10, 100, 500] {
        let document = generate_document(size);

        group.throughput(Throughput::Elements(size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, doc| {
            b.iter(|| split(black_box(doc)));
        });
    }

    group.finish();
}

fn bench_structural_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_diff");

    for size in [10, 100, 1000] {
        let old = generate_schema(size, 0);
        let new = generate_schema(size, 3);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &(old, new),
            |b, (old, new)| {
                b.iter(|| diff(black_box(old), black_box(new), ""));
            },
        );
    }

    group.finish();
}

fn bench_normalizer(c: &mut Criterion) {
    let old = to_canonical_string(&generate_document(100));
    let new = old.replace("1700000000", "1710000000");

    c.bench_function("identical_after_normalizing", |b| {
        b.iter(|| identical_after_normalizing(black_box(old.as_str()), black_box(new.as_str())));
    });
}

criterion_group!(benches, bench_split, bench_structural_diff, bench_normalizer);
criterion_main!(benches);
