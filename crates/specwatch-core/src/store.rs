//! Snapshot storage: the raw provider document plus one file per route unit
//!
//! Layout under the store root:
//!
//! ```text
//! {provider}/openapi.json|yaml     raw document as fetched
//! {provider}/routes/{unit id}      canonical bundled operation
//! ```

use crate::error::{Error, Result};
use crate::spec::{DocumentFormat, UnitMap};
use std::path::{Path, PathBuf};
use tracing::debug;

const RAW_STEM: &str = "openapi";
const ROUTES_DIR: &str = "routes";
const STAGING_DIR: &str = "routes.tmp";

/// File-backed store of the latest snapshot per provider
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn provider_dir(&self, provider: &str) -> PathBuf {
        self.root.join(provider)
    }

    fn routes_dir(&self, provider: &str) -> PathBuf {
        self.provider_dir(provider).join(ROUTES_DIR)
    }

    fn raw_path(&self, provider: &str, format: DocumentFormat) -> PathBuf {
        self.provider_dir(provider)
            .join(format!("{}.{}", RAW_STEM, format.extension()))
    }

    /// Whether a raw document was stored for `provider`
    pub async fn has_snapshot(&self, provider: &str) -> Result<bool> {
        for format in [DocumentFormat::Json, DocumentFormat::Yaml] {
            if tokio::fs::try_exists(self.raw_path(provider, format)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Previously stored route units, or `None` on a first run
    pub async fn load_units(&self, provider: &str) -> Result<Option<UnitMap>> {
        if !self.has_snapshot(provider).await? {
            return Ok(None);
        }

        let base = self.routes_dir(provider);
        let mut units = UnitMap::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let id = relative_id(&base, &path)?;
                let content = tokio::fs::read_to_string(&path).await?;
                units.insert(id, content);
            }
        }

        debug!(provider, units = units.len(), "loaded previous snapshot");
        Ok(Some(units))
    }

    /// Replace the stored snapshot with `raw` and `units`.
    ///
    /// Units are written to a staging directory that is swapped in once
    /// complete, so a failed save leaves the previous snapshot intact. The
    /// raw document is written last.
    pub async fn save(&self, provider: &str, raw: &str, units: &UnitMap) -> Result<()> {
        let provider_dir = self.provider_dir(provider);
        tokio::fs::create_dir_all(&provider_dir).await?;

        let staging = provider_dir.join(STAGING_DIR);
        remove_dir_if_exists(&staging).await?;
        if let Err(e) = write_units(&staging, units).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        let routes = self.routes_dir(provider);
        remove_dir_if_exists(&routes).await?;
        tokio::fs::rename(&staging, &routes).await?;

        let format = DocumentFormat::detect(raw);
        for other in [DocumentFormat::Json, DocumentFormat::Yaml] {
            if other != format {
                remove_if_exists(&self.raw_path(provider, other)).await?;
            }
        }
        tokio::fs::write(self.raw_path(provider, format), raw).await?;

        debug!(provider, units = units.len(), "saved snapshot");
        Ok(())
    }
}

async fn write_units(dir: &Path, units: &UnitMap) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for (id, content) in units {
        let path = dir.join(id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
    }
    Ok(())
}

async fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Unit id with forward slashes, relative to the routes directory
fn relative_id(base: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| Error::InvalidRoute(path.display().to_string()))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
