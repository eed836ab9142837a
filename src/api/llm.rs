// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
//! LLM transport contract and a JSON generate-endpoint transport with backoff.

use std::time::Duration;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::api::error::{Result, RewriteError};
use crate::api::retry::{retry_until_with, Backoff, RetryOutcome, RetryPolicy};

static REASONING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid reasoning-block regex"));

/// One generation request. The model identifier is opaque to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// The text being worked on, for transports that take it separately
    pub context: Option<String>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { model: model.into(), prompt: prompt.into(), context: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Request/response access to a text-generation backend.
///
/// Implementations own timeouts and transient-failure retries; an `Err` means the
/// request is given up.
pub trait LlmTransport {
    fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

/// Raw HTTP exchange, so any client can sit under [`GenerateEndpointTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub trait RawTransport {
    /// POST a JSON body to the generate endpoint.
    fn post(&self, body: &str) -> Result<RawResponse>;
}

/// Backoff settings for [`GenerateEndpointTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

/// Remove `<think>...</think>` reasoning blocks and surrounding whitespace.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

/// Build the generate-endpoint request body (non-streaming).
pub fn build_request_body(request: &GenerateRequest) -> String {
    json!({
        "model": request.model,
        "prompt": request.prompt,
        "stream": false
    })
    .to_string()
}

/// Extract the `response` field from a generate-endpoint body.
pub fn parse_response_body(body: &str) -> Result<String> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| RewriteError::Transport(format!("JSON parse error: {}", e)))?;

    json.get("response")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| RewriteError::Transport("Invalid response structure: missing 'response'".to_string()))
}

/// Transport for a JSON `{"model","prompt","stream"}` -> `{"response"}` endpoint.
///
/// Non-2xx statuses and malformed bodies become [`RewriteError::Transport`] and are
/// retried with exponential backoff, as is any raw error that
/// [`RewriteError::is_retryable`] accepts. Other raw errors end the request at once.
pub struct GenerateEndpointTransport<R: RawTransport> {
    raw: R,
    config: TransportConfig,
}

impl<R: RawTransport> GenerateEndpointTransport<R> {
    pub fn new(raw: R) -> Self {
        Self { raw, config: TransportConfig::default() }
    }

    pub fn with_config(raw: R, config: TransportConfig) -> Self {
        Self { raw, config }
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.max_attempts,
            base_delay: self.config.base_delay,
            backoff: Backoff::Exponential,
            retry_on_error: true,
        }
    }

    fn attempt(&self, body: &str, attempt: u32) -> Result<String> {
        let response = self.raw.post(body).map_err(|e| {
            warn!("[llm] Attempt {} failed: {}", attempt, e);
            e
        })?;

        if !(200..300).contains(&response.status) {
            warn!("[llm] Attempt {} failed: HTTP status {}", attempt, response.status);
            return Err(RewriteError::Transport(format!("HTTP error! status: {}", response.status)));
        }

        debug!("[llm] Raw response received: {} bytes", response.body.len());
        parse_response_body(&response.body).map_err(|e| {
            warn!("[llm] Attempt {} failed: {}", attempt, e);
            e
        })
    }
}

impl<R: RawTransport> LlmTransport for GenerateEndpointTransport<R> {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let body = build_request_body(request);
        info!("[llm] Sending request ({}), prompt {} chars", request.model, request.prompt.len());

        let outcome = retry_until_with(
            &self.policy(),
            |attempt| self.attempt(&body, attempt),
            |_| true,
            RewriteError::is_retryable,
        );
        match outcome {
            RetryOutcome::Accepted { value, .. } | RetryOutcome::Exhausted { last: value, .. } => {
                Ok(strip_reasoning(&value))
            }
            RetryOutcome::Failed { error, attempts } if error.is_retryable() => {
                warn!("[llm] Max retries reached after {} attempts", attempts);
                Err(RewriteError::Generation(error.to_string()))
            }
            RetryOutcome::Failed { error, attempts } => {
                warn!("[llm] Giving up on attempt {}: {}", attempts, error);
                Err(RewriteError::Generation(error.to_string()))
            }
        }
    }
}
