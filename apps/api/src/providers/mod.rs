//! AI provider abstraction.
//!
//! ARCHITECTURAL RULE: no other module talks to an AI API directly. All
//! calls go through `ProviderRegistry`, which orders the configured
//! providers by priority and falls back to the next one on failure.
//!
//! Providers speak plain HTTP via `reqwest` — no vendor SDKs.

use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod registry;

pub use registry::ProviderRegistry;

/// Per-call retry budget inside a single provider. Fallback to the next
/// provider happens only after this is exhausted.
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Provider '{provider}' exhausted {retries} retries: {last_error}")]
    Exhausted {
        provider: &'static str,
        retries: u32,
        last_error: String,
    },

    #[error("All AI providers failed; last error: {0}")]
    AllProvidersFailed(String),
}

impl ProviderError {
    /// Transport errors, rate limits, and server errors are worth retrying
    /// on the same provider. Anything else fails fast to the next one.
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A single AI completion backend.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends one system + user prompt pair and returns the text completion.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Shared retry loop: exponential backoff (1s, 2s, 4s) on retryable errors.
pub(crate) async fn call_with_retries<F, Fut>(
    provider: &'static str,
    mut attempt_fn: F,
) -> Result<String, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ProviderError>>,
{
    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                provider,
                attempt,
                "provider call failed, retrying after {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        match attempt_fn().await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(ProviderError::Exhausted {
        provider,
        retries: MAX_RETRIES,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Parses a completion as JSON after de-fencing.
pub fn parse_json_completion<T: DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    serde_json::from_str(strip_json_fences(text)).map_err(ProviderError::Parse)
}

/// Builds the shared HTTP client used by all providers.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .expect("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = ProviderError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_error_is_not_retryable() {
        let err = ProviderError::Api {
            status: 400,
            message: "bad request".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_error_is_not_retryable() {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert!(!ProviderError::Parse(err).is_retryable());
    }

    #[tokio::test]
    async fn test_retries_stop_on_non_retryable_error() {
        let mut calls = 0u32;
        let result = call_with_retries("test", || {
            calls += 1;
            async move {
                Err::<String, _>(ProviderError::Api {
                    status: 401,
                    message: "bad key".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Api { status: 401, .. })));
        assert_eq!(calls, 1, "Non-retryable error must not be retried");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_error_exhausts_budget() {
        let mut calls = 0u32;
        let result = call_with_retries("test", || {
            calls += 1;
            async move {
                Err::<String, _>(ProviderError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Exhausted { .. })));
        assert_eq!(calls, MAX_RETRIES);
    }
}
