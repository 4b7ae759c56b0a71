//! Priority-ordered provider selection with fallback.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::providers::{
    anthropic::AnthropicProvider, gemini::GeminiProvider, openai::OpenAiProvider,
    parse_json_completion, AiProvider, ProviderError,
};

/// Holds the enabled providers in priority order. Selection is
/// fallback-only: the first provider that succeeds wins, and a failure
/// (including unparseable JSON) moves on to the next.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the registry from configuration. A provider is enabled iff
    /// its API key is set AND it appears in the priority list.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut providers: Vec<Arc<dyn AiProvider>> = Vec::new();

        for name in &config.provider_priority {
            match name.as_str() {
                "anthropic" => {
                    if let Some(key) = &config.anthropic_api_key {
                        providers.push(Arc::new(AnthropicProvider::new(key.clone())));
                    }
                }
                "openai" => {
                    if let Some(key) = &config.openai_api_key {
                        providers.push(Arc::new(OpenAiProvider::new(key.clone())));
                    }
                }
                "gemini" => {
                    if let Some(key) = &config.gemini_api_key {
                        providers.push(Arc::new(GeminiProvider::new(key.clone())));
                    }
                }
                other => {
                    warn!("Unknown provider '{other}' in AI_PROVIDER_PRIORITY — skipping");
                }
            }
        }

        if providers.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "AI_PROVIDER_PRIORITY matched no configured provider"
            )));
        }

        info!(
            "AI providers enabled (priority order): {}",
            providers
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { providers })
    }

    /// Runs the prompt against providers in priority order, returning the
    /// first successful completion.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let mut last_error = String::from("no providers configured");

        for provider in &self.providers {
            match provider.complete(system, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        "provider failed, falling back: {e}"
                    );
                    last_error = format!("{}: {e}", provider.name());
                }
            }
        }

        Err(ProviderError::AllProvidersFailed(last_error))
    }

    /// Like [`complete`], but each provider's output must parse as `T`.
    /// A completion that fails to parse counts as a provider failure and
    /// triggers fallback.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, ProviderError> {
        let mut last_error = String::from("no providers configured");

        for provider in &self.providers {
            match provider.complete(system, prompt).await {
                Ok(text) => match parse_json_completion::<T>(&text) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            "provider returned unparseable JSON, falling back: {e}"
                        );
                        last_error = format!("{}: {e}", provider.name());
                    }
                },
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        "provider failed, falling back: {e}"
                    );
                    last_error = format!("{}: {e}", provider.name());
                }
            }
        }

        Err(ProviderError::AllProvidersFailed(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Test double: succeeds or fails with a fixed payload.
    struct StubProvider {
        name: &'static str,
        response: Option<String>,
    }

    #[async_trait]
    impl AiProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            match &self.response {
                Some(text) => Ok(text.clone()),
                None => Err(ProviderError::Api {
                    status: 500,
                    message: "stub failure".to_string(),
                }),
            }
        }
    }

    fn stub(name: &'static str, response: Option<&str>) -> Arc<dyn AiProvider> {
        Arc::new(StubProvider {
            name,
            response: response.map(String::from),
        })
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let registry = ProviderRegistry::new(vec![
            stub("primary", Some("from primary")),
            stub("secondary", Some("from secondary")),
        ]);

        let result = registry.complete("sys", "prompt").await.unwrap();
        assert_eq!(result, "from primary");
    }

    #[tokio::test]
    async fn test_fallback_on_provider_failure() {
        let registry = ProviderRegistry::new(vec![
            stub("primary", None),
            stub("secondary", Some("from secondary")),
        ]);

        let result = registry.complete("sys", "prompt").await.unwrap();
        assert_eq!(result, "from secondary");
    }

    #[tokio::test]
    async fn test_all_failed_reports_last_error() {
        let registry = ProviderRegistry::new(vec![stub("primary", None), stub("secondary", None)]);

        let err = registry.complete("sys", "prompt").await.unwrap_err();
        match err {
            ProviderError::AllProvidersFailed(msg) => {
                assert!(msg.contains("secondary"), "last error was: {msg}")
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_json_falls_back() {
        #[derive(serde::Deserialize)]
        struct Payload {
            score: u32,
        }

        let registry = ProviderRegistry::new(vec![
            stub("primary", Some("this is not json")),
            stub("secondary", Some(r#"{"score": 87}"#)),
        ]);

        let payload: Payload = registry.complete_json("sys", "prompt").await.unwrap();
        assert_eq!(payload.score, 87);
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        #[derive(serde::Deserialize)]
        struct Payload {
            score: u32,
        }

        let registry =
            ProviderRegistry::new(vec![stub("primary", Some("```json\n{\"score\": 42}\n```"))]);

        let payload: Payload = registry.complete_json("sys", "prompt").await.unwrap();
        assert_eq!(payload.score, 42);
    }
}
