//! LLM configuration parsed from environment variables.

use std::time::Duration;

use super::retry::{DEFAULT_RETRY_BASE_SECS, MAX_RETRIES, RetryPolicy};
use super::types::LlmError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_SUMMARY_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    /// Cheaper model used for secondary calls such as board summaries.
    pub summary_model: String,
    pub base_url: String,
    pub timeouts: LlmTimeouts,
    pub retry: RetryPolicy,
    /// Opaque session/trace headers forwarded on every request.
    pub extra_headers: Vec<(String, String)>,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Required:
    /// - `LLM_API_KEY_ENV` (names the env var containing the key)
    ///
    /// Optional:
    /// - `LLM_MODEL`, `LLM_SUMMARY_MODEL`
    /// - `LLM_BASE_URL`: default `https://api.anthropic.com`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 300
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    /// - `LLM_MAX_RETRIES`: default 3
    /// - `LLM_RETRY_BASE_SECS`: default 60
    /// - `LLM_EXTRA_HEADERS`: `name=value,name=value`
    ///
    /// # Errors
    ///
    /// Returns an error if the key variable is missing or an extra header entry is malformed.
    pub fn from_env() -> Result<Self, LlmError> {
        let key_var =
            std::env::var("LLM_API_KEY_ENV").map_err(|_| LlmError::MissingApiKey { var: "LLM_API_KEY_ENV".into() })?;
        let api_key = std::env::var(&key_var).map_err(|_| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let summary_model = std::env::var("LLM_SUMMARY_MODEL").unwrap_or_else(|_| DEFAULT_SUMMARY_MODEL.to_string());
        let base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };
        let retry = RetryPolicy {
            max_retries: env_parse("LLM_MAX_RETRIES", MAX_RETRIES),
            base_delay: Duration::from_secs(env_parse("LLM_RETRY_BASE_SECS", DEFAULT_RETRY_BASE_SECS)),
        };
        let extra_headers = parse_extra_headers(std::env::var("LLM_EXTRA_HEADERS").unwrap_or_default().as_str())?;

        Ok(Self { api_key, model, summary_model, base_url, timeouts, retry, extra_headers })
    }

    /// Config with defaults for everything but the key. Used by tests and embedders.
    #[must_use]
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            summary_model: DEFAULT_SUMMARY_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeouts: LlmTimeouts {
                request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS,
            },
            retry: RetryPolicy::default(),
            extra_headers: Vec::new(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key).map(|v| v.trim().parse::<T>()) {
        Ok(Ok(value)) => value,
        _ => default,
    }
}

fn parse_extra_headers(raw: &str) -> Result<Vec<(String, String)>, LlmError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| LlmError::ConfigParse(format!("LLM_EXTRA_HEADERS entry '{pair}' is not name=value")))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(LlmError::ConfigParse(format!("LLM_EXTRA_HEADERS entry '{pair}' has an empty name")));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
