//! Route splitting: one self-contained unit per `(method, path)` pair
//!
//! Unit ids look like `v1/chat/completions/post.json`. Path characters that
//! are awkward on a filesystem are escaped with fixed, reversible tokens.

use crate::error::{Error, Result};
use crate::spec::{bundle, strip_keys, to_canonical_string};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unit id to canonical unit content, ordered by unit id
pub type UnitMap = BTreeMap<String, String>;

/// Default prefix of vendor extension keys
pub const DEFAULT_EXTENSION_PREFIX: &str = "x-";

/// Operation keys of an OpenAPI path item
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const UNIT_SUFFIX: &str = ".json";

/// Escape tokens; `%` goes first so the mapping stays reversible
const ESCAPES: [(char, &str); 3] = [('%', "%25"), ('?', "%3F"), ('=', "%3D")];

/// Dots of a `.` or `..` segment, which must never reach the filesystem as is
const DOT_ESCAPE: (char, &str) = ('.', "%2E");

/// Split a document into route units, stripping `x-` extension keys first
pub fn split(document: &Value) -> UnitMap {
    split_with_prefix(document, DEFAULT_EXTENSION_PREFIX)
}

/// Split a document, stripping extension keys that start with `extension_prefix`
pub fn split_with_prefix(document: &Value, extension_prefix: &str) -> UnitMap {
    let mut document = document.clone();
    if !extension_prefix.is_empty() {
        strip_keys(&mut document, &|key: &str| key.starts_with(extension_prefix));
    }

    let mut units = UnitMap::new();
    let Some(Value::Object(paths)) = document.get("paths") else {
        return units;
    };

    for (path, item) in paths {
        let Value::Object(methods) = item else {
            continue;
        };
        for (method, operation) in methods {
            let method = method.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&method.as_str()) || !operation.is_object() {
                continue;
            }
            let bundled = bundle(operation, &document);
            units.insert(unit_id(&method, path), to_canonical_string(&bundled));
        }
    }

    units
}

/// Escape reserved characters of an API path
///
/// Segments made only of `.` or `..` have their dots escaped so a unit id
/// can never climb out of the directory it is joined onto.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 8);
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        if segment == "." || segment == ".." {
            for _ in 0..segment.len() {
                out.push_str(DOT_ESCAPE.1);
            }
            continue;
        }
        for ch in segment.chars() {
            match ESCAPES.iter().find(|(c, _)| *c == ch) {
                Some((_, token)) => out.push_str(token),
                None => out.push(ch),
            }
        }
    }
    out
}

/// Reverse [`escape_path`]
pub fn unescape_path(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let mut known = ESCAPES.iter().chain(std::iter::once(&DOT_ESCAPE));
        match known.find(|(_, token)| tail.starts_with(token)) {
            Some((ch, token)) => {
                out.push(*ch);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `{escapedPath}/{method}`, relative (no leading slash), without extension
pub fn unit_stem(method: &str, path: &str) -> String {
    let escaped = escape_path(path.trim_start_matches('/'));
    let method = method.to_ascii_lowercase();
    if escaped.is_empty() {
        method
    } else {
        format!("{}/{}", escaped, method)
    }
}

/// `{escapedPath}/{method}.json`
pub fn unit_id(method: &str, path: &str) -> String {
    format!("{}{}", unit_stem(method, path), UNIT_SUFFIX)
}

/// Recover `(method, path)` from a unit id
pub fn parse_unit_id(id: &str) -> Result<(String, String)> {
    let stem = id
        .strip_suffix(UNIT_SUFFIX)
        .ok_or_else(|| Error::InvalidRoute(id.to_string()))?;
    let (dir, method) = match memchr::memrchr(b'/', stem.as_bytes()) {
        Some(pos) => (&stem[..pos], &stem[pos + 1..]),
        None => ("", stem),
    };
    if !HTTP_METHODS.contains(&method) {
        return Err(Error::InvalidRoute(id.to_string()));
    }
    Ok((method.to_string(), format!("/{}", unescape_path(dir))))
}

/// `METHOD /path` label for a unit id
pub fn route_label(id: &str) -> Result<String> {
    let (method, path) = parse_unit_id(id)?;
    Ok(format!("{} {}", method.to_ascii_uppercase(), path))
}
