//! HTTP clients for specification retrieval and structured generation

pub mod client;
pub mod generation;

pub use client::{default_backoff, retry_with_backoff, SpecFetcher, DEFAULT_FETCH_ATTEMPTS};
pub use generation::HttpGenerationClient;
