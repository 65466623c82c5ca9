//! Per-provider change detection run
//!
//! One run goes: parse, split, compare with the stored snapshot, classify
//! changed routes, append to the ledger, persist the new snapshot. The
//! snapshot is only replaced after classification and the ledger write
//! succeed, so a failed run is retried against the same baseline.

use crate::classify::Classifier;
use crate::config::{validate_provider_name, PipelineConfig};
use crate::error::{Error, Result};
use crate::http::SpecFetcher;
use crate::ledger::ChangeLedger;
use crate::output::{build_body, build_first_run_title, build_title, RouteSummary};
use crate::spec::split::{route_label, split_with_prefix};
use crate::spec::{identical_after_normalizing, parse_document, UnitMap};
use crate::store::SnapshotStore;
use crate::traits::GenerationBackend;
use crate::types::{ChangeRecord, ChangeStatus, ChangedRoute, ClassifyInput, PipelineResult};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Compare two unit maps.
///
/// Units present only in `new` are added, only in `old` deleted, and in
/// both with different text modified. Modified units that are equal once
/// volatile example values are normalized are left out. Output is sorted
/// by unit id.
pub fn compare_units(old: &UnitMap, new: &UnitMap) -> Vec<ChangedRoute> {
    let ids: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut changed = Vec::new();

    for id in ids {
        let (status, content) = match (old.get(id), new.get(id)) {
            (None, Some(after)) => (ChangeStatus::Added, after),
            (Some(before), None) => (ChangeStatus::Deleted, before),
            (Some(before), Some(after)) => {
                if before == after || identical_after_normalizing(before, after) {
                    continue;
                }
                (ChangeStatus::Modified, after)
            }
            (None, None) => continue,
        };

        changed.push(ChangedRoute {
            relative_path: id.clone(),
            status,
            operation_id: operation_id(content),
        });
    }

    changed
}

fn operation_id(content: &str) -> Option<String> {
    let value: Value = serde_json::from_str(content).ok()?;
    value
        .get("operationId")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Change detection pipeline for any number of providers
pub struct Pipeline<G> {
    config: PipelineConfig,
    store: SnapshotStore,
    ledger: ChangeLedger,
    classifier: Classifier<G>,
    fetcher: SpecFetcher,
}

impl<G: GenerationBackend> Pipeline<G> {
    /// Create a pipeline rooted at `config.data_dir`
    pub fn new(config: PipelineConfig, backend: G) -> Result<Self> {
        config.validate()?;
        let store = SnapshotStore::new(config.specs_dir());
        let ledger = ChangeLedger::new(config.changelog_dir());
        let fetcher = SpecFetcher::with_retry(config.fetch_attempts, config.fetch_backoff.clone());

        Ok(Self {
            config,
            store,
            ledger,
            classifier: Classifier::new(backend),
            fetcher,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Snapshot store
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Change ledger
    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// Fetch the provider's document and process it
    pub async fn run(&self, provider: &str, url: &str) -> Result<PipelineResult> {
        validate_provider_name(provider)?;
        info!(provider, url, "fetching specification");
        let raw = self.fetcher.fetch(url).await?;
        self.run_document(provider, &raw).await
    }

    /// Process an already retrieved document
    pub async fn run_document(&self, provider: &str, raw: &str) -> Result<PipelineResult> {
        validate_provider_name(provider)?;

        let document = parse_document(raw)?;
        let units = split_with_prefix(&document, &self.config.extension_prefix);
        info!(provider, routes = units.len(), "split specification");

        let previous = match self.store.load_units(provider).await? {
            Some(previous) => previous,
            None => {
                info!(provider, "no snapshot found, recording baseline");
                self.store.save(provider, raw, &units).await?;
                return Ok(PipelineResult {
                    has_changes: false,
                    first_run: true,
                    title: build_first_run_title(provider),
                    body: format!("Recorded {} routes for {}.\n", units.len(), provider),
                    changed_routes: Vec::new(),
                });
            }
        };

        let mut changed = compare_units(&previous, &units);
        let mut inputs = Vec::with_capacity(changed.len());
        changed.retain(|route| match route_label(&route.relative_path) {
            Ok(label) => {
                inputs.push(ClassifyInput {
                    status: route.status,
                    route: label,
                    date: self.config.date.clone(),
                    old_content: previous.get(&route.relative_path).cloned(),
                    new_content: units.get(&route.relative_path).cloned(),
                });
                true
            }
            Err(e) => {
                warn!(provider, unit = %route.relative_path, error = %e, "skipping unit");
                false
            }
        });

        if changed.is_empty() {
            info!(provider, "no route changes");
            self.store.save(provider, raw, &units).await?;
            return Ok(PipelineResult {
                has_changes: false,
                first_run: false,
                title: build_title(provider, &changed),
                body: String::new(),
                changed_routes: changed,
            });
        }

        info!(
            provider,
            changed = changed.len(),
            concurrency = self.config.concurrency,
            "classifying changed routes"
        );
        let outcomes = self
            .classifier
            .classify_many(&inputs, self.config.concurrency)
            .await;

        let mut classifications = Vec::with_capacity(outcomes.len());
        for (input, outcome) in inputs.iter().zip(outcomes) {
            let classification = outcome.map_err(|e| {
                Error::Runtime(format!("classification failed for {}: {}", input.route, e))
            })?;
            classifications.push(classification);
        }

        let records: Vec<ChangeRecord> = classifications
            .iter()
            .flat_map(|c| c.changes.iter().cloned())
            .collect();
        let report = self.ledger.append(provider, &records).await?;
        info!(
            provider,
            appended = report.appended,
            dropped = report.dropped,
            files = ?report.files,
            "updated change ledger"
        );

        self.store.save(provider, raw, &units).await?;

        let summaries: Vec<RouteSummary<'_>> = inputs
            .iter()
            .zip(&classifications)
            .map(|(input, classification)| RouteSummary {
                route: &input.route,
                status: input.status,
                classification,
            })
            .collect();

        Ok(PipelineResult {
            has_changes: true,
            first_run: false,
            title: build_title(provider, &changed),
            body: build_body(provider, &summaries),
            changed_routes: changed,
        })
    }
}
