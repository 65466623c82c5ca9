//! Example normalization
//!
//! Providers often regenerate illustrative timestamps in `example` and
//! `examples` blocks on every publish. Normalizing those values to fixed
//! placeholders lets two snapshots that only differ there compare equal.

use crate::spec::{parse_document, to_canonical_string};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Placeholder for epoch-like digit runs
pub const TIMESTAMP_PLACEHOLDER: &str = "[TIMESTAMP]";
/// Placeholder for ISO-8601 date-times
pub const ISO_DATE_PLACEHOLDER: &str = "[ISO_DATE]";

static EPOCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10,13}$").expect("valid epoch regex"));

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})$")
        .expect("valid ISO-8601 regex")
});

/// Unit content in either parsed or serialized form
#[derive(Debug, Clone, Copy)]
pub enum UnitContent<'a> {
    /// Serialized JSON or YAML text
    Text(&'a str),
    /// Already parsed tree
    Tree(&'a Value),
}

impl<'a> From<&'a str> for UnitContent<'a> {
    fn from(text: &'a str) -> Self {
        UnitContent::Text(text)
    }
}

impl<'a> From<&'a String> for UnitContent<'a> {
    fn from(text: &'a String) -> Self {
        UnitContent::Text(text.as_str())
    }
}

impl<'a> From<&'a Value> for UnitContent<'a> {
    fn from(tree: &'a Value) -> Self {
        UnitContent::Tree(tree)
    }
}

impl UnitContent<'_> {
    fn parse(&self) -> Option<Value> {
        match self {
            UnitContent::Text(text) => parse_document(text).ok(),
            UnitContent::Tree(tree) => Some((*tree).clone()),
        }
    }

    fn verbatim(&self) -> String {
        match self {
            UnitContent::Text(text) => text.to_string(),
            UnitContent::Tree(tree) => to_canonical_string(tree),
        }
    }
}

fn is_example_key(key: &str) -> bool {
    key == "example" || key == "examples"
}

/// Replace timestamp-shaped values found under example keys
pub fn normalize(tree: &Value) -> Value {
    let mut out = tree.clone();
    normalize_in_place(&mut out);
    out
}

fn normalize_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if is_example_key(key) {
                    mask_timestamps(child);
                } else {
                    normalize_in_place(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_in_place),
        _ => {}
    }
}

/// Every value inside an example subtree is eligible
fn mask_timestamps(value: &mut Value) {
    match value {
        Value::String(s) => {
            if EPOCH_RE.is_match(s) {
                *value = Value::String(TIMESTAMP_PLACEHOLDER.to_string());
            } else if ISO_DATE_RE.is_match(s) {
                *value = Value::String(ISO_DATE_PLACEHOLDER.to_string());
            }
        }
        Value::Number(n) => {
            let digits = n
                .as_i64()
                .map(|i| i.unsigned_abs())
                .or_else(|| n.as_u64())
                .map(|u| u.to_string().len());
            if matches!(digits, Some(10..=13)) {
                *value = Value::String(TIMESTAMP_PLACEHOLDER.to_string());
            }
        }
        Value::Object(map) => map.values_mut().for_each(mask_timestamps),
        Value::Array(items) => items.iter_mut().for_each(mask_timestamps),
        Value::Null | Value::Bool(_) => {}
    }
}

/// Compare two unit contents after example normalization.
///
/// When either side fails to parse, the serialized forms are compared
/// verbatim instead.
pub fn identical_after_normalizing<'a, 'b>(
    a: impl Into<UnitContent<'a>>,
    b: impl Into<UnitContent<'b>>,
) -> bool {
    let (a, b) = (a.into(), b.into());
    match (a.parse(), b.parse()) {
        (Some(left), Some(right)) => {
            to_canonical_string(&normalize(&left)) == to_canonical_string(&normalize(&right))
        }
        _ => a.verbatim() == b.verbatim(),
    }
}
