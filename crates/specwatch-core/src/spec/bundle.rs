//! Reference bundling: make an operation self-contained by inlining the
//! transitive closure of the local `$ref` pointers it uses.
//!
//! Referenced subtrees are placed next to the operation at the same path
//! they occupy in the document (`#/components/schemas/User` lands under
//! `components.schemas.User`), so pointer syntax inside the operation stays
//! valid against the bundled node.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

const REF_KEY: &str = "$ref";
const LOCAL_PREFIX: &str = "#/";

/// Bundle `operation` with every subtree of `document` it references.
///
/// Unresolvable pointers are skipped. Without references the operation is
/// returned unchanged.
pub fn bundle(operation: &Value, document: &Value) -> Value {
    let resolved = resolve_closure(operation, document);
    if resolved.is_empty() {
        return operation.clone();
    }

    let mut components = Value::Object(Map::new());
    for (pointer, value) in resolved {
        insert_at(&mut components, &pointer_segments(&pointer), value);
    }

    let mut bundled = operation.clone();
    merge_missing(&mut bundled, components);
    bundled
}

/// Resolve every pointer reachable from `root`, in discovery order.
///
/// Visited pointers are tracked by their string form, which terminates
/// cyclic schemas.
fn resolve_closure(root: &Value, document: &Value) -> Vec<(String, Value)> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut resolved = Vec::new();

    let mut stack = Vec::new();
    collect_refs(root, &mut stack);
    stack.reverse();

    while let Some(pointer) = stack.pop() {
        if !visited.insert(pointer.clone()) {
            continue;
        }
        match resolve_pointer(document, &pointer) {
            Some(target) => {
                let mut nested = Vec::new();
                collect_refs(target, &mut nested);
                nested.reverse();
                stack.extend(nested);
                resolved.push((pointer, target.clone()));
            }
            None => debug!(pointer = %pointer, "skipping unresolvable reference"),
        }
    }

    resolved
}

/// Depth-first collection of `$ref` strings
fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get(REF_KEY) {
                out.push(pointer.clone());
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

/// Walk a local pointer (`#/a/b/c`) through the document
pub fn resolve_pointer<'a>(document: &'a Value, pointer: &str) -> Option<&'a Value> {
    if !pointer.starts_with(LOCAL_PREFIX) {
        return None;
    }
    pointer_segments(pointer)
        .iter()
        .try_fold(document, |node, segment| match node {
            Value::Object(map) => map.get(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .trim_start_matches(LOCAL_PREFIX)
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn insert_at(tree: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut node = tree;
    for segment in parents {
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}

/// Merge `extra` into `target`; keys already in `target` win.
fn merge_missing(target: &mut Value, extra: Value) {
    let (Value::Object(target_map), Value::Object(extra_map)) = (target, extra) else {
        return;
    };
    for (key, value) in extra_map {
        match target_map.get_mut(&key) {
            Some(existing) => merge_missing(existing, value),
            None => {
                target_map.insert(key, value);
            }
        }
    }
}
