//! HTTP adapter for a structured-generation endpoint
//!
//! The endpoint receives `{model?, system, prompt, schema_name, schema}` as
//! JSON and answers with the generated object, either bare or wrapped as
//! `{"output": {...}}`.

use crate::error::{Error, Result};
use crate::traits::{GenerationBackend, GenerationRequest};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Body fragments that identify a context-size rejection
const TOO_LARGE_MARKERS: [&str; 5] = [
    "context_length_exceeded",
    "context length",
    "maximum context",
    "too many tokens",
    "too large",
];

#[derive(Serialize)]
struct GenerationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    system: &'a str,
    prompt: &'a str,
    schema_name: &'a str,
    schema: &'a Value,
}

/// Generation backend over HTTP
pub struct HttpGenerationClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    model: Option<String>,
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpGenerationClient {
    /// Create a client for `endpoint`
    pub fn new(endpoint: String, token: Option<String>, model: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("specwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint,
            token,
            model,
        }
    }

    /// Create from `SPECWATCH_GENERATION_URL`, `SPECWATCH_GENERATION_TOKEN`
    /// and `SPECWATCH_GENERATION_MODEL`
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("SPECWATCH_GENERATION_URL")
            .map_err(|_| Error::Config("SPECWATCH_GENERATION_URL not set".to_string()))?;
        let token = std::env::var("SPECWATCH_GENERATION_TOKEN").ok();
        let model = std::env::var("SPECWATCH_GENERATION_MODEL").ok();
        Ok(Self::new(endpoint, token, model))
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GenerationBackend for HttpGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let body = GenerationBody {
            model: self.model.as_deref(),
            system: &request.system,
            prompt: &request.prompt,
            schema_name: request.schema_name,
            schema: &request.schema,
        };

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(ref token) = self.token {
            http = http.header("Authorization", format!("Bearer {}", token));
        }

        let response = http
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::PAYLOAD_TOO_LARGE {
            return Err(Error::InputTooLarge(format!("endpoint returned {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid JSON response: {}", e)))?;
        Ok(unwrap_output(value))
    }
}

/// Map an error response to a size failure or a plain generation failure
fn classify_failure(status: u16, body: &str) -> Error {
    let lower = body.to_ascii_lowercase();
    let snippet: String = body.chars().take(200).collect();
    if TOO_LARGE_MARKERS.iter().any(|m| lower.contains(m)) {
        Error::InputTooLarge(format!("status {}: {}", status, snippet))
    } else {
        Error::Generation(format!("status {}: {}", status, snippet))
    }
}

fn unwrap_output(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("output").is_some_and(Value::is_object) => map
            .remove("output")
            .unwrap_or(Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_token() {
        let client = HttpGenerationClient::new(
            "http://localhost/generate".into(),
            Some("secret-token".into()),
            None,
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_context_errors_are_too_large() {
        let err = classify_failure(
            400,
            r#"{"error":{"code":"context_length_exceeded","message":"..."}}"#,
        );
        assert!(err.is_input_too_large());
        let err = classify_failure(400, "prompt is too long: maximum context is 200000 tokens");
        assert!(err.is_input_too_large());
    }

    #[test]
    fn test_other_errors_are_generation_failures() {
        let err = classify_failure(500, "internal server error");
        assert!(!err.is_input_too_large());
        assert_eq!(err.kind(), crate::error::ErrorKind::Generation);
    }

    #[test]
    fn test_unwrap_output() {
        assert_eq!(
            unwrap_output(json!({"output": {"changes": []}})),
            json!({"changes": []})
        );
        assert_eq!(
            unwrap_output(json!({"changes": [], "summary": "s"})),
            json!({"changes": [], "summary": "s"})
        );
    }
}
