//! Core type definitions shared across the pipeline

use serde::{Deserialize, Deserializer, Serialize};

/// Literal used in [`PathChange`] when a side has no value
pub const ABSENT: &str = "null";

/// Status of a route unit between two snapshots (mirrors git name-status letters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeStatus {
    /// Route exists only in the new snapshot
    #[serde(rename = "A")]
    Added = b'A',
    /// Route exists in both snapshots with different content
    #[serde(rename = "M")]
    Modified = b'M',
    /// Route exists only in the old snapshot
    #[serde(rename = "D")]
    Deleted = b'D',
}

impl ChangeStatus {
    /// Parse from a status letter - zero allocation
    #[inline]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'A' => Some(Self::Added),
            b'M' => Some(Self::Modified),
            b'D' => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Status letter
    #[inline]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Get string representation
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

/// What happened to the classified element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Element introduced
    Added,
    /// Element modified
    Changed,
    /// Element removed
    Removed,
}

impl ChangeKind {
    /// Get string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        }
    }
}

/// Which part of a route a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTarget {
    /// The route as a whole
    Route,
    /// Parameters or request body
    Request,
    /// Response codes, headers or bodies
    Response,
}

impl ChangeTarget {
    /// Get string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// A single before/after pair inside a change record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathChange {
    /// Dotted/bracketed path relative to the route unit root
    pub path: String,
    /// Value before the change, `"null"` when absent
    #[serde(deserialize_with = "deserialize_side")]
    pub before: String,
    /// Value after the change, `"null"` when absent
    #[serde(deserialize_with = "deserialize_side")]
    pub after: String,
}

/// Accept any JSON value for a side and flatten it to text.
fn deserialize_side<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => ABSENT.to_string(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A classified change, stamped with the route and run date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Route label, `METHOD /path`
    pub route: String,
    /// ISO date of the run that detected the change
    pub date: String,
    /// What happened
    pub change: ChangeKind,
    /// Where it happened
    pub target: ChangeTarget,
    /// Existing clients may break
    pub breaking: bool,
    /// The element was marked deprecated
    pub deprecated: bool,
    /// Only descriptive or example content changed
    pub doc_only: bool,
    /// One-sentence human description
    pub note: String,
    /// Affected paths; empty for whole-route additions and removals
    #[serde(default)]
    pub paths: Vec<PathChange>,
}

/// Kind of a structural diff entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffEntryType {
    /// Present only on the new side
    Added,
    /// Present only on the old side
    Removed,
    /// Present on both sides with different values
    Changed,
}

impl DiffEntryType {
    /// Get string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
        }
    }
}

/// One path-addressed structural difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Dotted/bracketed path; empty for the root
    pub path: String,
    /// Kind of difference
    pub kind: DiffEntryType,
    /// Summarized old value
    pub old: Option<String>,
    /// Summarized new value
    pub new: Option<String>,
}

/// A route unit that differs between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedRoute {
    /// Unit id, e.g. `v1/models/get.json`
    pub relative_path: String,
    /// Added, modified or deleted
    pub status: ChangeStatus,
    /// `operationId` of the operation, when it declares one
    pub operation_id: Option<String>,
}

/// Input to the change classifier
#[derive(Debug, Clone)]
pub struct ClassifyInput {
    /// Added, modified or deleted
    pub status: ChangeStatus,
    /// Route label, `METHOD /path`
    pub route: String,
    /// ISO date stamped onto every record
    pub date: String,
    /// Old unit content; `None` for additions
    pub old_content: Option<String>,
    /// New unit content; `None` for removals
    pub new_content: Option<String>,
}

/// Classifier output for one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Records stamped with route and date
    pub changes: Vec<ChangeRecord>,
    /// Short prose summary of the route change
    pub summary: String,
}

/// Final result of one provider run, consumed by the notification step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// At least one route changed
    pub has_changes: bool,
    /// No earlier snapshot existed for the provider
    pub first_run: bool,
    /// One-line title
    pub title: String,
    /// Multi-line body
    pub body: String,
    /// Changed routes in unit id order
    pub changed_routes: Vec<ChangedRoute>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_status_from_byte() {
        assert_eq!(ChangeStatus::from_byte(b'A'), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_byte(b'M'), Some(ChangeStatus::Modified));
        assert_eq!(ChangeStatus::from_byte(b'D'), Some(ChangeStatus::Deleted));
        assert_eq!(ChangeStatus::from_byte(b'R'), None);
    }

    #[test]
    fn test_change_status_serializes_as_letter() {
        let json = serde_json::to_string(&ChangeStatus::Deleted).unwrap();
        assert_eq!(json, r#""D""#);
        assert_eq!(ChangeStatus::Modified.as_byte(), b'M');
    }

    #[test]
    fn test_changed_route_camel_case() {
        let route = ChangedRoute {
            relative_path: "v1/models/get.json".into(),
            status: ChangeStatus::Added,
            operation_id: Some("listModels".into()),
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["relativePath"], "v1/models/get.json");
        assert_eq!(json["status"], "A");
        assert_eq!(json["operationId"], "listModels");
    }

    #[test]
    fn test_path_change_accepts_null_and_scalars() {
        let change: PathChange =
            serde_json::from_str(r#"{"path":"a.b","before":null,"after":42}"#).unwrap();
        assert_eq!(change.before, ABSENT);
        assert_eq!(change.after, "42");
    }

    #[test]
    fn test_change_kind_lowercase() {
        let kind: ChangeKind = serde_json::from_str(r#""removed""#).unwrap();
        assert_eq!(kind, ChangeKind::Removed);
        assert_eq!(ChangeTarget::Response.as_str(), "response");
    }
}
