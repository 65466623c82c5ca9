//! Property-based tests using proptest

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use specwatch_core::spec::split::{escape_path, route_label, unescape_path};
use specwatch_core::spec::{bundle, diff, identical_after_normalizing, split};
use specwatch_core::{ChangeKind, ChangeLedger, ChangeRecord, ChangeTarget};
use tempfile::TempDir;

// Arbitrary JSON without any `$ref` key
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

// Generate arbitrary API paths
fn arb_api_path() -> impl Strategy<Value = String> {
    prop::string::string_regex("(/[a-z0-9_{}?=%.-]{1,10}){1,4}").expect("valid regex")
}

fn record(route: &str, note: String) -> ChangeRecord {
    ChangeRecord {
        route: route.into(),
        date: "2024-06-01".into(),
        change: ChangeKind::Added,
        target: ChangeTarget::Response,
        breaking: false,
        deprecated: false,
        doc_only: true,
        note,
        paths: Vec::new(),
    }
}

proptest! {
    #[test]
    fn test_diff_reflexive(value in arb_json()) {
        prop_assert!(diff(&value, &value, "").is_empty());
    }

    #[test]
    fn test_diff_detects_inequality(a in arb_json(), b in arb_json()) {
        if a != b {
            prop_assert!(!diff(&a, &b, "").is_empty());
        }
    }

    #[test]
    fn test_bundle_without_refs_is_identity(op in arb_json(), doc in arb_json()) {
        prop_assert_eq!(bundle(&op, &doc), op);
    }

    #[test]
    fn test_split_deterministic(paths in prop::collection::btree_set(arb_api_path(), 0..12)) {
        let mut map = Map::new();
        for path in &paths {
            map.insert(path.clone(), json!({"get": {"operationId": path}}));
        }
        let document = json!({"openapi": "3.1.0", "paths": map});

        let first = split(&document);
        let second = split(&document);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), paths.len());
        for id in first.keys() {
            prop_assert!(route_label(id).is_ok());
        }
    }

    #[test]
    fn test_escape_reversible(path in "[a-z.%?=/]{0,20}") {
        let escaped = escape_path(&path);
        prop_assert!(escaped.split('/').all(|seg| seg != "." && seg != ".."));
        prop_assert_eq!(unescape_path(&escaped), path);
    }

    #[test]
    fn test_timestamp_examples_normalize_equal(
        a in 1_000_000_000u64..9_999_999_999u64,
        b in 1_000_000_000u64..9_999_999_999u64,
    ) {
        let old = json!({"responses": {"200": {"example": {"created": a, "id": "x"}}}});
        let new = json!({"responses": {"200": {"example": {"created": b, "id": "x"}}}});
        prop_assert!(identical_after_normalizing(&old, &new));

        let moved = json!({"responses": {"200": {"example": {"created": b, "id": "y"}}}});
        prop_assert!(!identical_after_normalizing(&old, &moved));
    }

    #[test]
    fn test_ledger_append_associative(
        first in prop::collection::vec("[a-z]{1,8}", 1..4),
        second in prop::collection::vec("[a-z]{1,8}", 1..4),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let routes = ["GET /v1/models", "POST /v1/chat/completions"];
        let records = |notes: &[String]| -> Vec<ChangeRecord> {
            notes
                .iter()
                .enumerate()
                .map(|(i, n)| record(routes[i % 2], n.clone()))
                .collect()
        };
        let (r1, r2) = (records(&first), records(&second));

        let split_dir = TempDir::new().unwrap();
        let joined_dir = TempDir::new().unwrap();
        let split_ledger = ChangeLedger::new(split_dir.path());
        let joined_ledger = ChangeLedger::new(joined_dir.path());

        rt.block_on(async {
            split_ledger.append("p", &r1).await.unwrap();
            split_ledger.append("p", &r2).await.unwrap();
            let all: Vec<ChangeRecord> = r1.iter().chain(&r2).cloned().collect();
            joined_ledger.append("p", &all).await.unwrap();
        });

        for (method, path) in [("get", "/v1/models"), ("post", "/v1/chat/completions")] {
            let (a, b) = rt.block_on(async {
                (
                    split_ledger.read("p", method, path).await.unwrap(),
                    joined_ledger.read("p", method, path).await.unwrap(),
                )
            });
            prop_assert_eq!(a, b);
        }
    }
}
