//! Route change classifier

use crate::classify::prompt::{build_request, strip_documentation, PayloadStrategy};
use crate::error::{Error, Result};
use crate::spec::{diff, identical_after_normalizing, parse_document};
use crate::traits::GenerationBackend;
use crate::types::{
    ChangeKind, ChangeRecord, ChangeStatus, ChangeTarget, Classification, ClassifyInput,
    PathChange,
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// Default number of classification calls in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

const TIMESTAMP_CHURN_NOTE: &str = "Only example timestamps changed.";
const TIMESTAMP_CHURN_SUMMARY: &str = "Regenerated example timestamps; no contract change.";

/// Output shape requested from the generation backend
#[derive(Debug, Deserialize)]
struct GeneratedClassification {
    changes: Vec<GeneratedChange>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedChange {
    change: ChangeKind,
    target: ChangeTarget,
    breaking: bool,
    deprecated: bool,
    doc_only: bool,
    note: String,
    #[serde(default)]
    paths: Vec<PathChange>,
}

/// Classifies changed route units through a generation backend
pub struct Classifier<G> {
    backend: G,
}

impl<G: GenerationBackend> Classifier<G> {
    /// Create a classifier over `backend`
    pub fn new(backend: G) -> Self {
        Self { backend }
    }

    /// Borrow the backend
    pub fn backend(&self) -> &G {
        &self.backend
    }

    /// Classify one changed route.
    ///
    /// Example-timestamp churn short-circuits without calling the backend.
    /// Oversized prompts fall through [`PayloadStrategy::ORDER`]; any other
    /// backend failure is returned as is.
    pub async fn classify(&self, input: &ClassifyInput) -> Result<Classification> {
        if let Some(classification) = timestamp_churn(input) {
            debug!(route = %input.route, "example timestamp churn only");
            return Ok(classification);
        }

        let mut last_error = None;
        for strategy in PayloadStrategy::ORDER {
            let request = build_request(strategy, input);
            match self.backend.generate(&request).await {
                Ok(output) => {
                    let generated: GeneratedClassification = serde_json::from_value(output)
                        .map_err(|e| {
                            Error::Generation(format!(
                                "output for {} does not match schema: {}",
                                input.route, e
                            ))
                        })?;
                    debug!(
                        route = %input.route,
                        tier = strategy.tier(),
                        changes = generated.changes.len(),
                        "classified route"
                    );
                    return Ok(finish(input, generated));
                }
                Err(err) if err.is_input_too_large() => {
                    warn!(
                        route = %input.route,
                        strategy = strategy.as_str(),
                        "generation input too large, shrinking payload"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::InputTooLarge(format!("no payload strategy fit for {}", input.route))
        }))
    }

    /// Classify many routes with at most `concurrency` calls in flight.
    ///
    /// A new call starts as soon as any in-flight call finishes. Results
    /// come back in input order, and every call runs to completion even if
    /// an earlier one failed.
    pub async fn classify_many(
        &self,
        inputs: &[ClassifyInput],
        concurrency: usize,
    ) -> Vec<Result<Classification>> {
        stream::iter(inputs.iter().map(|input| self.classify(input)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

fn timestamp_churn(input: &ClassifyInput) -> Option<Classification> {
    if input.status != ChangeStatus::Modified {
        return None;
    }
    let (old, new) = (input.old_content.as_ref()?, input.new_content.as_ref()?);
    if !identical_after_normalizing(old, new) {
        return None;
    }
    Some(Classification {
        changes: vec![ChangeRecord {
            route: input.route.clone(),
            date: input.date.clone(),
            change: ChangeKind::Changed,
            target: ChangeTarget::Route,
            breaking: false,
            deprecated: false,
            doc_only: true,
            note: TIMESTAMP_CHURN_NOTE.to_string(),
            paths: Vec::new(),
        }],
        summary: TIMESTAMP_CHURN_SUMMARY.to_string(),
    })
}

/// Stamp pipeline metadata and enforce record invariants
fn finish(input: &ClassifyInput, generated: GeneratedClassification) -> Classification {
    let whole_route = input.status != ChangeStatus::Modified;
    let documentation_only = !whole_route && only_documentation_changed(input);

    let changes = generated
        .changes
        .into_iter()
        .map(|change| {
            let paths = if whole_route && change.target == ChangeTarget::Route {
                Vec::new()
            } else {
                change.paths
            };
            ChangeRecord {
                route: input.route.clone(),
                date: input.date.clone(),
                change: change.change,
                target: change.target,
                breaking: change.breaking,
                deprecated: change.deprecated,
                doc_only: change.doc_only || documentation_only,
                note: change.note,
                paths,
            }
        })
        .collect();

    Classification {
        changes,
        summary: generated.summary,
    }
}

/// True when both sides parse and agree once documentation keys are gone
fn only_documentation_changed(input: &ClassifyInput) -> bool {
    let parse = |content: Option<&str>| {
        content.and_then(|text| parse_document(text).ok()).map(|mut tree| {
            strip_documentation(&mut tree);
            tree
        })
    };
    match (
        parse(input.old_content.as_deref()),
        parse(input.new_content.as_deref()),
    ) {
        (Some(old), Some(new)) => diff(&old, &new, "").is_empty(),
        _ => false,
    }
}
