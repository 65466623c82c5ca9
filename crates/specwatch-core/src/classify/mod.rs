//! Change classification through a structured-generation backend

pub mod classifier;
pub mod prompt;

pub use classifier::{Classifier, DEFAULT_CONCURRENCY};
pub use prompt::{output_schema, PayloadStrategy, DOCUMENTATION_KEYS};
