//! Specification retrieval over HTTP with retry

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts before a fetch is treated as fatal
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Delays between attempts: 5s after the first failure, 30s after the second
pub fn default_backoff() -> Vec<Duration> {
    vec![Duration::from_secs(5), Duration::from_secs(30)]
}

/// Run `op` up to `attempts` times, sleeping `delays[i]` after failure `i`.
///
/// The last delay is reused when there are more failures than delays.
pub async fn retry_with_backoff<T, F, Fut>(attempts: u32, delays: &[Duration], mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = delays
                    .get((attempt - 1) as usize)
                    .or_else(|| delays.last())
                    .copied()
                    .unwrap_or_default();
                warn!(attempt, delay_secs = delay.as_secs(), error = %e, "attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Downloads raw specification documents
pub struct SpecFetcher {
    client: reqwest::Client,
    attempts: u32,
    backoff: Vec<Duration>,
}

impl SpecFetcher {
    /// Fetcher with the default retry schedule
    pub fn new() -> Self {
        Self::with_retry(DEFAULT_FETCH_ATTEMPTS, default_backoff())
    }

    /// Fetcher with a custom retry schedule
    pub fn with_retry(attempts: u32, backoff: Vec<Duration>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("specwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            attempts,
            backoff,
        }
    }

    /// Fetch the document at `url`, retrying transport errors and
    /// non-success statuses.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        retry_with_backoff(self.attempts, &self.backoff, |attempt| {
            debug!(url, attempt, "fetching specification");
            self.fetch_once(url)
        })
        .await
        .map_err(|e| {
            Error::Fetch(format!(
                "{} failed after {} attempts: {}",
                url,
                self.attempts.max(1),
                e.message()
            ))
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!("server returned {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read body: {}", e)))
    }
}

impl Default for SpecFetcher {
    fn default() -> Self {
        Self::new()
    }
}
