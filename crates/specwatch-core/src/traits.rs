//! Trait seams for external capabilities

use crate::error::Result;
use serde_json::Value;
use std::future::Future;

/// A single structured-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Standing instructions
    pub system: String,
    /// Task-specific prompt
    pub prompt: String,
    /// Name of the output schema
    pub schema_name: &'static str,
    /// JSON Schema the output must conform to
    pub schema: Value,
}

/// Text-generation service returning schema-conforming JSON.
///
/// Implementations must report an oversized prompt as
/// [`Error::InputTooLarge`](crate::Error::InputTooLarge) and every other
/// failure with a different variant; the classifier retries only the former.
/// Static dispatch, no boxing.
pub trait GenerationBackend: Send + Sync {
    /// Run one generation call
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> impl Future<Output = Result<Value>> + Send + 'a;
}

impl<T: GenerationBackend> GenerationBackend for &T {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> impl Future<Output = Result<Value>> + Send + 'a {
        (**self).generate(request)
    }
}
