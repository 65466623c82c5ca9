//! Append-only per-route change history
//!
//! One YAML file per `(provider, path, method)` holds the route's change
//! records in the order they were detected. Appends read the whole file and
//! write it back, so callers must not append to the same provider from two
//! processes at once.

use crate::error::{Error, Result};
use crate::spec::split::{unit_stem, HTTP_METHODS};
use crate::types::{ChangeKind, ChangeRecord, ChangeTarget, PathChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LEDGER_SUFFIX: &str = ".yaml";

/// A stored change record; the route is implied by the file location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// ISO date of detection
    pub date: String,
    /// What happened
    pub change: ChangeKind,
    /// Where it happened
    pub target: ChangeTarget,
    /// Existing clients may break
    pub breaking: bool,
    /// Marked deprecated
    pub deprecated: bool,
    /// Descriptive content only
    pub doc_only: bool,
    /// Human description
    pub note: String,
    /// Affected paths
    #[serde(default)]
    pub paths: Vec<PathChange>,
}

impl From<ChangeRecord> for LedgerEntry {
    fn from(record: ChangeRecord) -> Self {
        Self {
            date: record.date,
            change: record.change,
            target: record.target,
            breaking: record.breaking,
            deprecated: record.deprecated,
            doc_only: record.doc_only,
            note: record.note,
            paths: record.paths,
        }
    }
}

/// Storage key derived from a `METHOD /path` route label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    /// Lower-case HTTP method
    pub method: String,
    /// API path, starting with `/`
    pub path: String,
}

impl RouteKey {
    /// Parse `METHOD /path`
    pub fn parse(route: &str) -> Result<Self> {
        let bytes = route.as_bytes();
        let space = memchr::memchr(b' ', bytes).ok_or_else(|| invalid(route))?;
        let method = route[..space].to_ascii_lowercase();
        let path = route[space + 1..].trim();

        if !HTTP_METHODS.contains(&method.as_str()) || !path.starts_with('/') {
            return Err(invalid(route));
        }

        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

fn invalid(route: &str) -> Error {
    Error::InvalidRoute(format!("expected `METHOD /path`, got {:?}", route))
}

/// Outcome of one append
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerReport {
    /// Records written
    pub appended: usize,
    /// Records dropped for a missing or malformed route
    pub dropped: usize,
    /// Files touched, in key order
    pub files: Vec<PathBuf>,
}

/// File-backed change ledger
#[derive(Debug, Clone)]
pub struct ChangeLedger {
    root: PathBuf,
}

impl ChangeLedger {
    /// Ledger rooted at `root`; one subdirectory per provider
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the history of one route
    pub fn file_path(&self, provider: &str, key: &RouteKey) -> PathBuf {
        self.root
            .join(provider)
            .join(format!("{}{}", unit_stem(&key.method, &key.path), LEDGER_SUFFIX))
    }

    /// Append records, grouped by route.
    ///
    /// Records with a missing or malformed route are dropped with a warning.
    /// Not idempotent: appending the same records twice stores them twice.
    pub async fn append(&self, provider: &str, records: &[ChangeRecord]) -> Result<LedgerReport> {
        let mut report = LedgerReport::default();
        let mut groups: BTreeMap<RouteKey, Vec<LedgerEntry>> = BTreeMap::new();

        for record in records {
            match RouteKey::parse(&record.route) {
                Ok(key) => groups
                    .entry(key)
                    .or_default()
                    .push(LedgerEntry::from(record.clone())),
                Err(e) => {
                    warn!(provider, error = %e, "dropping change record");
                    report.dropped += 1;
                }
            }
        }

        for (key, new_entries) in groups {
            let path = self.file_path(provider, &key);
            let mut entries = read_entries(&path).await?;
            report.appended += new_entries.len();
            entries.extend(new_entries);
            write_entries(&path, &entries).await?;
            debug!(file = %path.display(), total = entries.len(), "ledger updated");
            report.files.push(path);
        }

        Ok(report)
    }

    /// Stored history of one route; empty when nothing was recorded yet
    pub async fn read(&self, provider: &str, method: &str, path: &str) -> Result<Vec<LedgerEntry>> {
        let key = RouteKey {
            method: method.to_ascii_lowercase(),
            path: path.to_string(),
        };
        read_entries(&self.file_path(provider, &key)).await
    }
}

async fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(e)),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&text)
        .map_err(|e| Error::Yaml(format!("ledger file {}: {}", path.display(), e)))
}

async fn write_entries(path: &Path, entries: &[LedgerEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let text = serde_yaml::to_string(entries)?;
    let tmp = path.with_extension("yaml.tmp");
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(route: &str, note: &str) -> ChangeRecord {
        ChangeRecord {
            route: route.into(),
            date: "2024-06-01".into(),
            change: ChangeKind::Changed,
            target: ChangeTarget::Request,
            breaking: false,
            deprecated: false,
            doc_only: false,
            note: note.into(),
            paths: vec![PathChange {
                path: "requestBody.required".into(),
                before: "null".into(),
                after: "true".into(),
            }],
        }
    }

    #[test]
    fn test_route_key_parse() {
        let key = RouteKey::parse("POST /v1/chat/completions").unwrap();
        assert_eq!(key.method, "post");
        assert_eq!(key.path, "/v1/chat/completions");
        assert!(RouteKey::parse("").is_err());
        assert!(RouteKey::parse("POST").is_err());
        assert!(RouteKey::parse("POST v1/models").is_err());
        assert!(RouteKey::parse("FETCH /v1/models").is_err());
    }

    #[tokio::test]
    async fn test_append_groups_by_route() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        let records = vec![
            record("POST /v1/chat/completions", "a"),
            record("POST /v1/chat/completions", "b"),
            record("GET /v1/models", "c"),
        ];

        let report = ledger.append("openai", &records).await.unwrap();
        assert_eq!(report.appended, 3);
        assert_eq!(report.files.len(), 2);

        let chat = ledger.read("openai", "POST", "/v1/chat/completions").await.unwrap();
        let models = ledger.read("openai", "get", "/v1/models").await.unwrap();
        assert_eq!(chat.len(), 2);
        assert_eq!(models.len(), 1);

        let text = std::fs::read_to_string(
            dir.path().join("openai/v1/chat/completions/post.yaml"),
        )
        .unwrap();
        assert!(!text.contains("route"));
    }

    #[tokio::test]
    async fn test_field_order_in_file() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        ledger
            .append("openai", &[record("GET /v1/models", "n")])
            .await
            .unwrap();
        let text = std::fs::read_to_string(dir.path().join("openai/v1/models/get.yaml")).unwrap();
        let order = ["date:", "change:", "target:", "breaking:", "deprecated:", "doc_only:", "note:", "paths:"];
        let positions: Vec<usize> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        ledger.append("p", &[record("GET /a", "first")]).await.unwrap();
        ledger.append("p", &[record("GET /a", "second")]).await.unwrap();
        let notes: Vec<String> = ledger
            .read("p", "get", "/a")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.note)
            .collect();
        assert_eq!(notes, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_malformed_routes_dropped() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        let report = ledger
            .append("p", &[record("", "x"), record("GETX", "y"), record("GET /ok", "z")])
            .await
            .unwrap();
        assert_eq!(report.dropped, 2);
        assert_eq!(report.appended, 1);
    }

    #[tokio::test]
    async fn test_escaped_path_file() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        ledger.append("p", &[record("GET /search?q=1", "s")]).await.unwrap();
        assert!(dir.path().join("p/search%3Fq%3D1/get.yaml").exists());
    }

    #[tokio::test]
    async fn test_traversal_route_stays_inside_ledger() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("changelog");
        let ledger = ChangeLedger::new(&root);
        let report = ledger
            .append("p", &[record("GET /../../outside", "n")])
            .await
            .unwrap();
        assert_eq!(report.appended, 1);
        assert!(report.files[0].starts_with(&root));
        assert!(root.join("p/%2E%2E/%2E%2E/outside/get.yaml").exists());
        assert!(!dir.path().join("outside").exists());
        assert_eq!(ledger.read("p", "get", "/../../outside").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ChangeLedger::new(dir.path());
        assert!(ledger.read("p", "get", "/none").await.unwrap().is_empty());
    }
}
