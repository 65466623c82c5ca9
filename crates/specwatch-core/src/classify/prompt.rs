//! Prompt construction for the change classifier
//!
//! Three payload strategies are tried in order, each smaller than the last:
//! full unit content, content without documentation keys, and finally the
//! structural diff alone.

use crate::spec::{diff, parse_document, render_diff, strip_keys, to_canonical_string};
use crate::traits::GenerationRequest;
use crate::types::{ChangeStatus, ClassifyInput};
use serde_json::{json, Map, Value};

/// Keys that carry prose or illustrations only
pub const DOCUMENTATION_KEYS: [&str; 3] = ["description", "example", "examples"];

/// Name of the output schema sent with every request
pub const SCHEMA_NAME: &str = "route_changes";

const SYSTEM_PROMPT: &str = "\
You review changes to a single route of a provider's OpenAPI document.
Report every change as one entry of `changes`:
- change: added, changed or removed
- target: route when the whole operation appears or disappears, request for \
parameters and request bodies, response for status codes, headers and response bodies
- breaking: true when an existing client could fail (removed fields or routes, \
new required inputs, narrowed types or enums)
- deprecated: true when the change marks something as deprecated
- doc_only: true when only descriptions, summaries or examples changed
- note: one short sentence for a changelog reader
- paths: the affected locations in dotted/bracketed notation relative to the \
route definition, with before and after values as text; use \"null\" for a missing side. \
Leave paths empty when the whole route was added or removed.
Finish with `summary`: one or two sentences describing the route change overall.";

/// Payload strategy, in the order the classifier tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadStrategy {
    /// Complete old/new unit content
    FullContent = 1,
    /// Content with [`DOCUMENTATION_KEYS`] removed
    WithoutDocumentation = 2,
    /// Rendered structural diff only
    StructuralDiff = 3,
}

impl PayloadStrategy {
    /// Strategies from largest to smallest payload
    pub const ORDER: [PayloadStrategy; 3] = [
        PayloadStrategy::FullContent,
        PayloadStrategy::WithoutDocumentation,
        PayloadStrategy::StructuralDiff,
    ];

    /// 1-based tier number
    #[inline]
    pub const fn tier(&self) -> u8 {
        *self as u8
    }

    /// Get string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullContent => "full_content",
            Self::WithoutDocumentation => "without_documentation",
            Self::StructuralDiff => "structural_diff",
        }
    }
}

/// JSON Schema of the classifier output
pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["changes", "summary"],
        "properties": {
            "changes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["change", "target", "breaking", "deprecated", "doc_only", "note", "paths"],
                    "properties": {
                        "change": {"type": "string", "enum": ["added", "changed", "removed"]},
                        "target": {"type": "string", "enum": ["route", "request", "response"]},
                        "breaking": {"type": "boolean"},
                        "deprecated": {"type": "boolean"},
                        "doc_only": {"type": "boolean"},
                        "note": {"type": "string"},
                        "paths": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["path", "before", "after"],
                                "properties": {
                                    "path": {"type": "string"},
                                    "before": {"type": "string"},
                                    "after": {"type": "string"}
                                }
                            }
                        }
                    }
                }
            },
            "summary": {"type": "string"}
        }
    })
}

/// Build the generation request for one strategy
pub fn build_request(strategy: PayloadStrategy, input: &ClassifyInput) -> GenerationRequest {
    let body = match strategy {
        PayloadStrategy::FullContent => content_sections(input, |text| text.to_string()),
        PayloadStrategy::WithoutDocumentation => content_sections(input, without_documentation),
        PayloadStrategy::StructuralDiff => diff_section(input),
    };

    let prompt = format!(
        "Route: {}\nStatus: {}\n\n{}\nClassify the changes to this route.",
        input.route,
        input.status.as_str(),
        body
    );

    GenerationRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        schema_name: SCHEMA_NAME,
        schema: output_schema(),
    }
}

fn content_sections<F>(input: &ClassifyInput, render: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut sections = String::new();
    match input.status {
        ChangeStatus::Modified => {
            push_block(&mut sections, "Old definition", input.old_content.as_deref(), &render);
            push_block(&mut sections, "New definition", input.new_content.as_deref(), &render);
        }
        ChangeStatus::Added => {
            push_block(&mut sections, "Added definition", input.new_content.as_deref(), &render);
        }
        ChangeStatus::Deleted => {
            push_block(&mut sections, "Removed definition", input.old_content.as_deref(), &render);
        }
    }
    sections
}

fn push_block<F>(buf: &mut String, title: &str, content: Option<&str>, render: &F)
where
    F: Fn(&str) -> String,
{
    let rendered = content.map(render).unwrap_or_else(|| "null\n".to_string());
    buf.push_str(title);
    buf.push_str(":\n```json\n");
    buf.push_str(&rendered);
    if !rendered.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str("```\n\n");
}

fn diff_section(input: &ClassifyInput) -> String {
    let old = side_tree(input.old_content.as_deref());
    let new = side_tree(input.new_content.as_deref());
    let entries = diff(&old, &new, "");
    format!(
        "Structural differences (one per line, long values truncated):\n{}\n",
        render_diff(&entries)
    )
}

/// Parsed side of a change; a missing or unparseable side diffs as `{}`
fn side_tree(content: Option<&str>) -> Value {
    content
        .and_then(|text| parse_document(text).ok())
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Remove [`DOCUMENTATION_KEYS`] at every depth
pub fn strip_documentation(value: &mut Value) {
    strip_keys(value, &|key: &str| DOCUMENTATION_KEYS.contains(&key));
}

fn without_documentation(text: &str) -> String {
    match parse_document(text) {
        Ok(mut tree) => {
            strip_documentation(&mut tree);
            to_canonical_string(&tree)
        }
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified() -> ClassifyInput {
        ClassifyInput {
            status: ChangeStatus::Modified,
            route: "POST /v1/audio".into(),
            date: "2024-06-01".into(),
            old_content: Some(
                r#"{"description":"Old words","properties":{"rate":{"type":"integer"}}}"#.into(),
            ),
            new_content: Some(
                r#"{"description":"New words","properties":{"rate":{"type":"string"}}}"#.into(),
            ),
        }
    }

    #[test]
    fn test_strategy_order_and_tiers() {
        let tiers: Vec<u8> = PayloadStrategy::ORDER.iter().map(|s| s.tier()).collect();
        assert_eq!(tiers, vec![1, 2, 3]);
    }

    #[test]
    fn test_full_content_embeds_both_sides() {
        let request = build_request(PayloadStrategy::FullContent, &modified());
        assert!(request.prompt.contains("Route: POST /v1/audio"));
        assert!(request.prompt.contains("Old words"));
        assert!(request.prompt.contains("New words"));
        assert_eq!(request.schema_name, SCHEMA_NAME);
    }

    #[test]
    fn test_without_documentation_strips_descriptions() {
        let request = build_request(PayloadStrategy::WithoutDocumentation, &modified());
        assert!(!request.prompt.contains("Old words"));
        assert!(request.prompt.contains("\"integer\""));
    }

    #[test]
    fn test_structural_diff_only() {
        let request = build_request(PayloadStrategy::StructuralDiff, &modified());
        assert!(request
            .prompt
            .contains("changed properties.rate.type: integer -> string"));
        assert!(!request.prompt.contains("```json"));
    }

    #[test]
    fn test_added_route_uses_single_side() {
        let input = ClassifyInput {
            status: ChangeStatus::Added,
            route: "GET /v1/models".into(),
            date: "2024-06-01".into(),
            old_content: None,
            new_content: Some(r#"{"operationId":"listModels"}"#.into()),
        };
        let request = build_request(PayloadStrategy::FullContent, &input);
        assert!(request.prompt.contains("Added definition"));
        assert!(!request.prompt.contains("Old definition"));

        let diff_request = build_request(PayloadStrategy::StructuralDiff, &input);
        assert!(diff_request.prompt.contains("added operationId: listModels"));
    }

    #[test]
    fn test_schema_enumerates_values() {
        let schema = output_schema();
        let item = &schema["properties"]["changes"]["items"];
        assert_eq!(item["properties"]["target"]["enum"][2], "response");
        assert_eq!(item["required"].as_array().unwrap().len(), 7);
    }
}
