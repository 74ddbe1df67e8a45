//! Anthropic Messages API client.
//!
//! Thin HTTP wrapper for `/v1/messages` in both plain and streaming mode.
//! Both modes share one send path that retries 429/529 per [`RetryPolicy`].
//! Pure parsing in `parse_response` for testability.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use super::config::LlmConfig;
use super::retry::{self, RetryPolicy};
use super::stream::{StreamCallbacks, decode_stream};
use super::types::{ChatRequest, ChatResponse, ContentBlock, LlmChat, LlmError, Message, Tool, is_retryable_status};

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    retry: RetryPolicy,
    extra_headers: HeaderMap,
}

impl AnthropicClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra header is invalid or the HTTP client fails to build.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;

        let mut extra_headers = HeaderMap::new();
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LlmError::ConfigParse(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| LlmError::ConfigParse(format!("invalid header value for {name}: {e}")))?;
            extra_headers.insert(name, value);
        }

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            url: format!("{}{MESSAGES_PATH}", config.base_url),
            model: config.model.clone(),
            retry: config.retry,
            extra_headers,
        })
    }

    /// POST the request, retrying rate-limited and overloaded responses.
    ///
    /// Returns the first successful response; every other status is an error.
    async fn send(&self, body: &ApiRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .headers(self.extra_headers.clone())
                .json(body)
                .send()
                .await
                .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

            let status = response.status().as_u16();
            if response.status().is_success() {
                return Ok(response);
            }

            let retry_after = retry::retry_after(response.headers());
            let text = error_body(status, response.text().await);
            if is_retryable_status(status) && self.retry.allows(attempt) {
                let delay = self.retry.delay(attempt, retry_after);
                warn!(status, attempt, delay_secs = delay.as_secs_f64(), "llm: retryable status; backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(LlmError::ApiResponse { status, body: text });
        }
    }

    fn body<'a>(&'a self, request: &'a ChatRequest<'a>, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: request.model.unwrap_or(&self.model),
            max_tokens: request.max_tokens,
            system: request.system,
            messages: request.messages,
            tools: request.tools,
            thinking: request
                .thinking
                .map(|budget_tokens| ThinkingConfig { kind: "enabled", budget_tokens }),
            stream: stream.then_some(true),
        }
    }
}

#[async_trait::async_trait]
impl LlmChat for AnthropicClient {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let body = self.body(request, false);
        let response = self.send(&body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        parse_response(&text)
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
        callbacks: &mut (dyn StreamCallbacks + Send),
    ) -> Result<ChatResponse, LlmError> {
        let body = self.body(request, true);
        let response = self.send(&body).await?;
        let decoded = decode_stream(response.bytes_stream(), callbacks).await?;
        info!(
            blocks = decoded.blocks.len(),
            stop_reason = ?decoded.stop_reason,
            output_tokens = decoded.output_tokens,
            "llm: stream complete"
        );
        Ok(ChatResponse {
            content: decoded.blocks,
            model: decoded.model.unwrap_or_else(|| body.model.to_string()),
            stop_reason: decoded.stop_reason,
            input_tokens: decoded.input_tokens,
            output_tokens: decoded.output_tokens,
        })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(serde::Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(serde::Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Default, serde::Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_response(json: &str) -> Result<ChatResponse, LlmError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let content: Vec<ContentBlock> = api
        .content
        .into_iter()
        .filter(|block| !matches!(block, ContentBlock::Unknown))
        .collect();

    Ok(ChatResponse {
        content,
        model: api.model,
        stop_reason: api.stop_reason,
        input_tokens: api.usage.input_tokens,
        output_tokens: api.usage.output_tokens,
    })
}

/// Body text for an error status; a failed read is described in place of the body.
fn error_body<E: std::fmt::Display>(status: u16, read: Result<String, E>) -> String {
    match read {
        Ok(text) => text,
        Err(e) => {
            debug!(status, error = %e, "llm: error body unreadable");
            format!("<error body unreadable: {e}>")
        }
    }
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
