//! Completion providers.
//!
//! The trait is deliberately narrow: one completion turn in, one string
//! out. Retry policy, auth and endpoint shape are the provider's own
//! business; the interpreter core never retries.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use crate::config::CompletionConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::interpreter::fallback::RuleInterpreter;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> PipelineResult<String>;

    /// Short label for debug metadata, e.g. `openai/gpt-4o-mini`.
    fn name(&self) -> &str;
}

/// OpenAI-compatible chat-completions client; works against OpenAI,
/// OpenRouter and anything else speaking the same wire shape.
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    config: CompletionConfig,
    label: String,
}

impl OpenAiCompletionProvider {
    pub fn new(config: CompletionConfig) -> PipelineResult<Self> {
        if config.api_key.is_none() {
            return Err(PipelineError::InvalidConfig(
                "completion provider requires an api key".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let label = format!("openai/{}", config.model);
        Ok(Self {
            client,
            config,
            label,
        })
    }

    fn url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1");
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    async fn request_once(&self, system: &str, user: &str) -> PipelineResult<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": self.config.temperature,
        });
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Completion(format!("completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Completion(format!(
                "completion API returned {status}: {text}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Completion(format!("completion response unreadable: {e}")))?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Completion("completion response carried no content".to_string())
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    /// One bounded retry after a short pause; a second failure is final.
    async fn complete(&self, system: &str, user: &str) -> PipelineResult<String> {
        let mut last_err = PipelineError::Completion("completion never attempted".to_string());
        for attempt in 1..=2u32 {
            if attempt > 1 {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            match self.request_once(system, user).await {
                Ok(content) => return Ok(content),
                Err(err) => {
                    warn!("completion attempt {attempt} failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Keyless provider that answers with the rule interpreter's own output,
/// wrapped in a code fence the way real models tend to despite
/// instructions. Keeps the full LLM path exercisable offline.
#[derive(Debug, Default)]
pub struct StubCompletionProvider;

impl StubCompletionProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionProvider for StubCompletionProvider {
    async fn complete(&self, _system: &str, user: &str) -> PipelineResult<String> {
        let parsed = RuleInterpreter::new().interpret(user);
        let body = serde_json::to_string_pretty(&parsed)
            .map_err(|e| PipelineError::Completion(e.to_string()))?;
        Ok(format!("```json\n{body}\n```"))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_without_key_is_rejected() {
        let config = CompletionConfig {
            api_key: None,
            ..CompletionConfig::default()
        };
        assert!(matches!(
            OpenAiCompletionProvider::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_tolerated() {
        let config = CompletionConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("https://openrouter.ai/api/v1/".to_string()),
            ..CompletionConfig::default()
        };
        let provider = OpenAiCompletionProvider::new(config).unwrap();
        assert_eq!(provider.url(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[tokio::test]
    async fn stub_answers_with_fenced_json() {
        let provider = StubCompletionProvider::new();
        let answer = provider.complete("system", "윤석열 공약 알려줘").await.unwrap();
        assert!(answer.starts_with("```json"), "{answer}");
        assert!(answer.contains("public_data_pledge"), "{answer}");
    }
}
