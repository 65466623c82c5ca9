//! # Specwatch Core
//!
//! Change detection for published OpenAPI documents.
//!
//! Each run splits a provider's document into one self-contained unit per
//! operation, compares the units with the previous snapshot, asks a
//! structured-generation backend to classify what changed, and appends the
//! resulting records to a per-route YAML ledger.
//!
//! ## Example
//!
//! ```no_run
//! use specwatch_core::{HttpGenerationClient, Pipeline, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpGenerationClient::from_env()?;
//! let config = PipelineConfig {
//!     data_dir: "data".into(),
//!     ..Default::default()
//! };
//!
//! let pipeline = Pipeline::new(config, backend)?;
//! let result = pipeline
//!     .run("openai", "https://example.com/openapi.yaml")
//!     .await?;
//! println!("{}", result.title);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod spec;
pub mod store;
pub mod traits;
pub mod types;

pub use classify::Classifier;
pub use config::{PipelineConfig, ProviderRegistry};
pub use error::{Error, ErrorKind, Result};
pub use http::{HttpGenerationClient, SpecFetcher};
pub use ledger::{ChangeLedger, LedgerEntry};
pub use pipeline::{compare_units, Pipeline};
pub use store::SnapshotStore;
pub use traits::{GenerationBackend, GenerationRequest};
pub use types::{
    ChangeKind, ChangeRecord, ChangeStatus, ChangeTarget, ChangedRoute, Classification,
    ClassifyInput, DiffEntry, DiffEntryType, PathChange, PipelineResult,
};
