//! LLM: Anthropic Messages adapter for the board agent.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables (`config`). The
//! `LlmClient` wraps the HTTP client and exposes it through the provider-
//! neutral [`LlmChat`] trait so the agent loop can be driven by a mock in
//! tests. Streaming (`stream`) and retry (`retry`) live in their own modules
//! because both are exercised without any network.

pub mod anthropic;
pub mod config;
pub mod retry;
pub mod stream;
pub mod tools;
pub mod types;

use config::LlmConfig;
pub use stream::StreamCallbacks;
pub use types::LlmChat;
use types::{ChatRequest, ChatResponse, LlmError};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete LLM client configured by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: anthropic::AnthropicClient,
    model: String,
    summary_model: String,
}

impl LlmClient {
    /// Build an LLM client from environment variables. See [`LlmConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let inner = anthropic::AnthropicClient::new(config)?;
        Ok(Self { inner, model: config.model.clone(), summary_model: config.summary_model.clone() })
    }

    /// Return the configured model name (e.g. `"claude-sonnet-4-5-20250929"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Model used for secondary calls such as board summaries.
    #[must_use]
    pub fn summary_model(&self) -> &str {
        &self.summary_model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        self.inner.chat(request).await
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
        callbacks: &mut (dyn StreamCallbacks + Send),
    ) -> Result<ChatResponse, LlmError> {
        self.inner.chat_stream(request, callbacks).await
    }
}
