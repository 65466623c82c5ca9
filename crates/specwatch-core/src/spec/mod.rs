//! Specification document handling: parsing, splitting, bundling,
//! example normalization and structural diffing.
//!
//! Documents are modelled as [`serde_json::Value`]. Objects keep keys in
//! sorted order, so [`to_canonical_string`] is byte-stable for structurally
//! identical trees.

pub mod bundle;
pub mod diff;
pub mod normalize;
pub mod split;

pub use bundle::bundle;
pub use diff::{diff, render_diff};
pub use normalize::{identical_after_normalizing, normalize, UnitContent};
pub use split::{split, UnitMap};

use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};

/// Serialization format of a raw specification document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON text
    Json,
    /// YAML text
    Yaml,
}

impl DocumentFormat {
    /// Sniff the format from the first significant character
    pub fn detect(raw: &str) -> Self {
        match raw.trim_start().as_bytes().first() {
            Some(b'{') | Some(b'[') => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }

    /// File extension used when persisting the raw document
    pub const fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Yaml => "yaml",
        }
    }
}

/// Parse raw JSON or YAML text into a document tree
pub fn parse_document(raw: &str) -> Result<Value> {
    match DocumentFormat::detect(raw) {
        DocumentFormat::Json => serde_json::from_str(raw).map_err(Error::from),
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(yaml_to_json(yaml))
        }
    }
}

/// Pretty-printed JSON with sorted keys and a trailing newline
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    out.push('\n');
    out
}

/// Remove every object key matching `reject`, at any depth
pub fn strip_keys<F>(value: &mut Value, reject: &F)
where
    F: Fn(&str) -> bool,
{
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !reject(key));
            for child in map.values_mut() {
                strip_keys(child, reject);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_keys(item, reject);
            }
        }
        _ => {}
    }
}

/// Convert a YAML tree, stringifying non-string mapping keys (`200:` etc.)
fn yaml_to_json(yaml: serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_format() {
        assert_eq!(DocumentFormat::detect("  {\"a\":1}"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::detect("openapi: 3.1.0"), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::Yaml.extension(), "yaml");
    }

    #[test]
    fn test_parse_yaml_stringifies_status_codes() {
        let raw = "paths:\n  /a:\n    get:\n      responses:\n        200:\n          description: ok\n";
        let doc = parse_document(raw).unwrap();
        assert_eq!(
            doc["paths"]["/a"]["get"]["responses"]["200"]["description"],
            "ok"
        );
    }

    #[test]
    fn test_parse_json_and_yaml_agree() {
        let from_json = parse_document(r#"{"openapi":"3.0.0","info":{"version":"1"}}"#).unwrap();
        let from_yaml = parse_document("openapi: 3.0.0\ninfo:\n  version: '1'\n").unwrap();
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_document("{ not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Json);
    }

    #[test]
    fn test_canonical_string_sorted_with_newline() {
        let value = json!({"b": 1, "a": 2});
        let out = to_canonical_string(&value);
        assert!(out.ends_with("}\n"));
        assert!(out.find("\"a\"").unwrap() < out.find("\"b\"").unwrap());
    }

    #[test]
    fn test_strip_keys_recursive() {
        let mut value = json!({
            "x-internal": true,
            "get": {"x-code-samples": [], "summary": "s", "items": [{"x-a": 1, "b": 2}]}
        });
        strip_keys(&mut value, &|k: &str| k.starts_with("x-"));
        assert_eq!(value, json!({"get": {"summary": "s", "items": [{"b": 2}]}}));
    }
}
