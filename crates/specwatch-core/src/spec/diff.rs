//! Structural diff of two JSON trees
//!
//! The comparison is positional for arrays and key-wise for objects. It
//! reports every leaf-level difference but makes no attempt at a minimal
//! edit script: a reordered array shows up as changed elements.

use crate::types::{DiffEntry, DiffEntryType};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Values longer than this are truncated in summaries
pub const MAX_SUMMARY_CHARS: usize = 300;

const ELLIPSIS: &str = "...";

/// Compute the differences between `old` and `new`, addressed from `path`
pub fn diff(old: &Value, new: &Value, path: &str) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_into(old, new, path, &mut entries);
    entries
}

fn diff_into(old: &Value, new: &Value, path: &str, out: &mut Vec<DiffEntry>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Array(old_items), Value::Array(new_items)) => {
            let len = old_items.len().max(new_items.len());
            for i in 0..len {
                let item_path = index_path(path, i);
                match (old_items.get(i), new_items.get(i)) {
                    (Some(o), Some(n)) => diff_into(o, n, &item_path, out),
                    (None, Some(n)) => out.push(added(item_path, n)),
                    (Some(o), None) => out.push(removed(item_path, o)),
                    (None, None) => {}
                }
            }
        }
        (Value::Object(old_map), Value::Object(new_map)) => {
            let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
            for key in keys {
                let key_path = key_path(path, key);
                match (old_map.get(key.as_str()), new_map.get(key.as_str())) {
                    (Some(o), Some(n)) => diff_into(o, n, &key_path, out),
                    (None, Some(n)) => out.push(added(key_path, n)),
                    (Some(o), None) => out.push(removed(key_path, o)),
                    (None, None) => {}
                }
            }
        }
        // type mismatch or differing scalars
        _ => out.push(DiffEntry {
            path: path.to_string(),
            kind: DiffEntryType::Changed,
            old: Some(summarize(old)),
            new: Some(summarize(new)),
        }),
    }
}

fn added(path: String, value: &Value) -> DiffEntry {
    DiffEntry {
        path,
        kind: DiffEntryType::Added,
        old: None,
        new: Some(summarize(value)),
    }
}

fn removed(path: String, value: &Value) -> DiffEntry {
    DiffEntry {
        path,
        kind: DiffEntryType::Removed,
        old: Some(summarize(value)),
        new: None,
    }
}

fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Short text form of a value: strings verbatim, everything else as
/// compact JSON, truncated past [`MAX_SUMMARY_CHARS`].
pub fn summarize(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    truncate(text)
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_SUMMARY_CHARS) {
        Some((cut, _)) => {
            let mut short = text[..cut].to_string();
            short.push_str(ELLIPSIS);
            short
        }
        None => text,
    }
}

/// One line per entry, used as prompt input when full content is too large
pub fn render_diff(entries: &[DiffEntry]) -> String {
    let mut buf = String::with_capacity(entries.len() * 48);
    for entry in entries {
        let path = if entry.path.is_empty() { "(root)" } else { entry.path.as_str() };
        let old = entry.old.as_deref().unwrap_or("null");
        let new = entry.new.as_deref().unwrap_or("null");
        let _ = match entry.kind {
            DiffEntryType::Added => writeln!(buf, "added {}: {}", path, new),
            DiffEntryType::Removed => writeln!(buf, "removed {}: {}", path, old),
            DiffEntryType::Changed => writeln!(buf, "changed {}: {} -> {}", path, old, new),
        };
    }
    buf
}
