//! Grounded LLM API interaction with exponential backoff retry logic.
//!
//! This module talks to a Gemini-style `generateContent` endpoint with the
//! search-grounding tool enabled, so every reply carries the citations the
//! model consulted. The trait-based design keeps the pieces composable:
//!
//! - [`GroundedAsk`]: Core trait defining async grounded interaction
//! - [`GroundedClient`]: HTTP client for the real endpoint
//! - [`RetryAsk`]: Decorator that adds retry logic to any `GroundedAsk` implementation
//!
//! # Retry Strategy
//!
//! Only transient upstream failures are retried: HTTP 429, HTTP 503, and any
//! error whose text mentions being overloaded. Everything else fails fast.
//! The delay ladder is deterministic, `base_delay * 2^(attempt-1)` with no
//! jitter, so a failing sync takes the same time every run.

use crate::models::{Citation, GroundedReply};
use crate::utils::truncate_for_log;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// How much of an upstream error body survives into logs and error text.
const ERROR_BODY_SNIPPET: usize = 300;

/// Failures talking to the grounded model endpoint.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("api key environment variable {0} is not set")]
    MissingApiKey(String),
}

impl UpstreamError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Rate limiting (429) and service unavailability (503) are transient by
    /// definition; some backends instead report overload inside an error
    /// payload with an otherwise generic status, so the error text is checked
    /// too.
    pub fn is_retryable(&self) -> bool {
        if let Self::Status { status, .. } = self {
            if matches!(status, 429 | 503) {
                return true;
            }
        }
        self.to_string().to_ascii_lowercase().contains("overloaded")
    }
}

/// Trait for async grounded LLM interaction.
///
/// Implementors send a prompt and receive the model's reply together with
/// the web citations backing it. The abstraction allows decorators (like
/// retry logic) and test doubles.
pub trait GroundedAsk {
    /// The type of reply returned by the model.
    type Reply;

    /// Send a prompt and receive a grounded reply.
    async fn ask(&self, prompt: &str) -> Result<Self::Reply, UpstreamError>;
}

impl<T> GroundedAsk for &T
where
    T: GroundedAsk,
{
    type Reply = T::Reply;

    async fn ask(&self, prompt: &str) -> Result<Self::Reply, UpstreamError> {
        (**self).ask(prompt).await
    }
}

/// Wrapper that adds backoff retry logic to any [`GroundedAsk`] implementation.
///
/// The decorator retries only errors that [`UpstreamError::is_retryable`]
/// marks transient; others are returned to the caller on the first attempt.
///
/// # Backoff Strategy
///
/// The delay before retry `n` is `base_delay * 2^(n-1)`. With the default
/// three retries and a 1.5s base that means 1.5s, 3s, 6s.
pub struct RetryAsk<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: GroundedAsk,
{
    /// Create a new retry wrapper around an existing [`GroundedAsk`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl<T> GroundedAsk for RetryAsk<T>
where
    T: GroundedAsk + fmt::Debug,
{
    type Reply = T::Reply;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<Self::Reply, UpstreamError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(reply) => {
                    return Ok(reply);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() {
                        error!(
                            attempt,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() failed with non-retryable error"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // Exponent clamps at 31; deeper ladders plateau rather
                    // than overflow the shift.
                    let delay = self
                        .base_delay
                        .saturating_mul(1u32 << (attempt - 1).min(31));
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// HTTP client for a `generateContent` endpoint with search grounding.
pub struct GroundedClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GroundedClient {
    /// Build a client with its own connection pool and request timeout.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            urlencoding::encode(&self.api_key)
        )
    }
}

impl fmt::Debug for GroundedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroundedClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GroundedAsk for GroundedClient {
    type Reply = GroundedReply;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<Self::Reply, UpstreamError> {
        let t0 = Instant::now();
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
        });

        let response = self.http.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms = dt.as_millis() as u128,
                "API call failed"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: truncate_for_log(&text, ERROR_BODY_SNIPPET),
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Malformed(format!("unreadable reply json: {e}")))?;
        let reply = into_reply(parsed)?;
        info!(
            elapsed_ms = dt.as_millis() as u128,
            reply_chars = reply.text.chars().count(),
            citations = reply.citations.len(),
            "API call succeeded"
        );
        Ok(reply)
    }
}

/// High-level function to ask the grounded model with backoff retry logic.
///
/// This is the primary entry point for running one query. It wraps the
/// client with [`RetryAsk`] so transient upstream failures are absorbed.
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff<T>(
    client: &T,
    prompt: &str,
    max_retries: usize,
    base_delay: StdDuration,
) -> Result<T::Reply, UpstreamError>
where
    T: GroundedAsk + fmt::Debug,
{
    let t0 = Instant::now();
    let api = RetryAsk::new(client, max_retries, base_delay);
    let res = api.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            "ask_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u128, error = %e, "ask_with_backoff failed")
        }
    }
    res
}

// Wire shapes for the generateContent reply. Only the fields we read are
// modeled; everything else in the payload is ignored.

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WireWebSource>,
}

#[derive(Debug, Deserialize)]
struct WireWebSource {
    uri: Option<String>,
    #[serde(default)]
    title: String,
}

fn into_reply(response: GenerateResponse) -> Result<GroundedReply, UpstreamError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(UpstreamError::Malformed(
            "reply carried no candidates".to_string(),
        ));
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    // Chunks without a web uri (e.g. retrieved passages) carry nothing the
    // verifier can substitute, so they are dropped here.
    let citations = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    web.uri.filter(|uri| !uri.is_empty()).map(|uri| Citation {
                        uri,
                        title: web.title,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GroundedReply { text, citations })
}
