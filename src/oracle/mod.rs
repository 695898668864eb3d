//! Delegated Yield Oracle Module
//!
//! The delegated estimation strategy forwards a structured prompt to an
//! external text-generation service and extracts a yield figure from the
//! free-text reply. The service is an opaque collaborator: nothing beyond
//! this request/response contract is assumed, and every failure mode is
//! recovered inside the estimator by falling back to the heuristic
//! strategy — [`OracleError`] never crosses the estimator boundary.
//!
//! [`HttpTextGenerator`] targets hosted inference endpoints that accept
//! `{"inputs": "<prompt>", "parameters": {...}}` and reply with either
//! `[{"generated_text": "..."}]`, `{"generated_text": "..."}`, or a plain
//! text body.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from a text-generation oracle call.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The oracle could not be constructed or reached at all
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The request itself failed (transport, HTTP status)
    #[error("oracle request failed: {0}")]
    Request(String),

    /// The oracle replied with an empty or unusable body
    #[error("oracle returned an empty response")]
    EmptyResponse,
}

/// Contract for the external text-generation collaborator.
///
/// Implementations must be safe for concurrent read-only use: the handle is
/// created once and shared across analysis requests behind an `Arc`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a free-text response for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Sampling temperature requested from the endpoint.
const GENERATION_TEMPERATURE: f64 = 0.3;

/// Token budget requested from the endpoint.
const MAX_NEW_TOKENS: u32 = 512;

/// HTTP text-generation backend for hosted inference endpoints.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpTextGenerator {
    /// Build a client for the given endpoint.
    ///
    /// The timeout here is a transport-level backstop; the estimator
    /// additionally applies its own call budget.
    pub fn new(
        endpoint: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token,
        })
    }

    /// Pull generated text out of the lenient response shapes hosted
    /// endpoints use.
    fn extract_text(body: &str) -> Option<String> {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            let text = match &value {
                Value::Array(items) => items
                    .first()
                    .and_then(|item| item.get("generated_text"))
                    .and_then(Value::as_str),
                Value::Object(_) => value.get("generated_text").and_then(Value::as_str),
                Value::String(s) => Some(s.as_str()),
                _ => None,
            };
            return text.map(ToOwned::to_owned);
        }

        // Not JSON — treat the raw body as the generation
        if body.trim().is_empty() {
            None
        } else {
            Some(body.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "temperature": GENERATION_TEMPERATURE,
                "max_new_tokens": MAX_NEW_TOKENS,
            }
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Request(format!(
                "endpoint returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        debug!(bytes = body.len(), "Oracle response received");

        Self::extract_text(&body).ok_or(OracleError::EmptyResponse)
    }

    fn backend_name(&self) -> &'static str {
        "http-inference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_from_array_shape() {
        let body = r#"[{"generated_text": "Predicted yield is 87.5% overall."}]"#;
        assert_eq!(
            HttpTextGenerator::extract_text(body).as_deref(),
            Some("Predicted yield is 87.5% overall.")
        );
    }

    #[test]
    fn extracts_text_from_object_shape() {
        let body = r#"{"generated_text": "92% with temperature drift"}"#;
        assert_eq!(
            HttpTextGenerator::extract_text(body).as_deref(),
            Some("92% with temperature drift")
        );
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(
            HttpTextGenerator::extract_text("plain reply 88%").as_deref(),
            Some("plain reply 88%")
        );
    }

    #[test]
    fn empty_body_yields_none() {
        assert!(HttpTextGenerator::extract_text("   ").is_none());
        assert!(HttpTextGenerator::extract_text("[]").is_none());
        assert!(HttpTextGenerator::extract_text("{}").is_none());
    }
}
