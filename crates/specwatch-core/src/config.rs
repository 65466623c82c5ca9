//! Pipeline configuration and the provider registry

use crate::classify::DEFAULT_CONCURRENCY;
use crate::error::{Error, Result};
use crate::http::{default_backoff, DEFAULT_FETCH_ATTEMPTS};
use crate::spec::split::DEFAULT_EXTENSION_PREFIX;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SPECS_DIR: &str = "specs";
const CHANGELOG_DIR: &str = "changelog";

/// Today's date (UTC) as `YYYY-MM-DD`
pub fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Settings for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for snapshots (`specs/`) and the ledger (`changelog/`)
    pub data_dir: PathBuf,
    /// Keys with this prefix are dropped before splitting
    pub extension_prefix: String,
    /// Classification calls in flight at once
    pub concurrency: usize,
    /// Attempts per document fetch
    pub fetch_attempts: u32,
    /// Delays between fetch attempts
    pub fetch_backoff: Vec<Duration>,
    /// Date stamped on change records
    pub date: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            extension_prefix: DEFAULT_EXTENSION_PREFIX.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_backoff: default_backoff(),
            date: today(),
        }
    }
}

impl PipelineConfig {
    /// Snapshot store root
    pub fn specs_dir(&self) -> PathBuf {
        self.data_dir.join(SPECS_DIR)
    }

    /// Ledger root
    pub fn changelog_dir(&self) -> PathBuf {
        self.data_dir.join(CHANGELOG_DIR)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.fetch_attempts == 0 {
            return Err(Error::Config("fetch attempts must be at least 1".to_string()));
        }
        chrono::NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| Error::Config(format!("invalid date '{}': {}", self.date, e)))?;
        Ok(())
    }
}

/// One entry of the provider registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum ProviderEntry {
    /// `name: https://...`
    Url(String),
    /// `name: { url: https://... }`
    Detailed { url: String },
}

/// Provider names mapped to their specification URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, String>,
}

impl ProviderRegistry {
    /// Parse the registry YAML
    ///
    /// ```yaml
    /// openai: https://example.com/openapi.yaml
    /// anthropic:
    ///   url: https://example.com/anthropic.json
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let entries: BTreeMap<String, ProviderEntry> =
            serde_yaml::from_str(yaml).map_err(|e| Error::Yaml(e.to_string()))?;

        let mut providers = BTreeMap::new();
        for (name, entry) in entries {
            validate_provider_name(&name)?;
            let url = match entry {
                ProviderEntry::Url(url) | ProviderEntry::Detailed { url } => url,
            };
            providers.insert(name, url);
        }
        Ok(Self { providers })
    }

    /// Read and parse a registry file
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read providers file '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// URL of one provider
    pub fn url(&self, provider: &str) -> Option<&str> {
        self.providers.get(provider).map(|s| s.as_str())
    }

    /// All providers in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.providers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// No providers configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Provider names become directory names
pub fn validate_provider_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid provider name '{}'", name)))
    }
}
