//! Natural-language query interpretation.
//!
//! Two paths produce the same [`ParsedQuery`] schema: a completion provider
//! constrained by the system prompt in [`prompt`], and the deterministic
//! [`RuleInterpreter`]. Completion failures of any kind (transport, HTTP,
//! malformed JSON) are logged and silently recovered by the fallback; the
//! caller only ever sees a parsed query.

pub mod fallback;
pub mod gazetteer;
pub mod prompt;
pub mod provider;

use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::{CompletionConfig, CompletionProviderKind};
use crate::error::{PipelineError, PipelineResult};
use crate::types::ParsedQuery;

pub use fallback::RuleInterpreter;
pub use provider::{CompletionProvider, OpenAiCompletionProvider, StubCompletionProvider};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterPath {
    Completion,
    Fallback,
}

/// Which path produced the query, with prompt/response hashes instead of
/// the texts themselves so debug metadata stays small and key-free.
#[derive(Debug, Clone, Serialize)]
pub struct InterpreterDebug {
    pub path: InterpreterPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub prompt_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_sha256: Option<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Interpretation {
    pub parsed: ParsedQuery,
    pub debug: InterpreterDebug,
}

pub struct QueryInterpreter {
    provider: Option<Box<dyn CompletionProvider>>,
    fallback: RuleInterpreter,
}

impl QueryInterpreter {
    pub fn from_config(config: &CompletionConfig) -> Self {
        let provider: Option<Box<dyn CompletionProvider>> = match config.provider {
            CompletionProviderKind::Stub => Some(Box::new(StubCompletionProvider::new())),
            CompletionProviderKind::OpenAi => match OpenAiCompletionProvider::new(config.clone()) {
                Ok(provider) => Some(Box::new(provider)),
                Err(err) => {
                    warn!("completion provider unavailable ({err}), rule fallback only");
                    None
                }
            },
        };
        Self {
            provider,
            fallback: RuleInterpreter::new(),
        }
    }

    pub fn with_provider(provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            provider: Some(provider),
            fallback: RuleInterpreter::new(),
        }
    }

    pub fn rule_only() -> Self {
        Self {
            provider: None,
            fallback: RuleInterpreter::new(),
        }
    }

    pub async fn interpret(&self, text: &str) -> ParsedQuery {
        self.interpret_with_debug(text).await.parsed
    }

    pub async fn interpret_with_debug(&self, text: &str) -> Interpretation {
        let started = Instant::now();
        let prompt_sha256 = sha256_hex(prompt::SYSTEM_PROMPT);

        if let Some(provider) = &self.provider {
            match self.complete_and_parse(provider.as_ref(), text).await {
                Ok((parsed, response_sha256)) => {
                    debug!("completion path parsed query via {}", provider.name());
                    return Interpretation {
                        parsed,
                        debug: InterpreterDebug {
                            path: InterpreterPath::Completion,
                            provider: Some(provider.name().to_string()),
                            prompt_sha256,
                            response_sha256: Some(response_sha256),
                            latency_ms: started.elapsed().as_millis() as u64,
                            error: None,
                        },
                    };
                }
                Err(err) => {
                    warn!("completion interpretation failed ({err}), using rule fallback");
                    return Interpretation {
                        parsed: self.fallback.interpret(text),
                        debug: InterpreterDebug {
                            path: InterpreterPath::Fallback,
                            provider: Some(provider.name().to_string()),
                            prompt_sha256,
                            response_sha256: None,
                            latency_ms: started.elapsed().as_millis() as u64,
                            error: Some(err.to_string()),
                        },
                    };
                }
            }
        }

        Interpretation {
            parsed: self.fallback.interpret(text),
            debug: InterpreterDebug {
                path: InterpreterPath::Fallback,
                provider: None,
                prompt_sha256,
                response_sha256: None,
                latency_ms: started.elapsed().as_millis() as u64,
                error: None,
            },
        }
    }

    async fn complete_and_parse(
        &self,
        provider: &dyn CompletionProvider,
        text: &str,
    ) -> PipelineResult<(ParsedQuery, String)> {
        let raw = provider.complete(prompt::SYSTEM_PROMPT, text).await?;
        let response_sha256 = sha256_hex(&raw);
        let body = strip_code_fences(&raw);
        let mut parsed: ParsedQuery = serde_json::from_str(body.trim()).map_err(|e| {
            PipelineError::Completion(format!("completion returned malformed query JSON: {e}"))
        })?;
        sanitize(&mut parsed, text);
        Ok((parsed, response_sha256))
    }
}

/// Models fence their JSON no matter how firmly the prompt forbids it.
fn strip_code_fences(content: &str) -> &str {
    if let Some(caps) = CODE_FENCE_RE.captures(content) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str();
        }
    }
    content.trim()
}

fn sanitize(parsed: &mut ParsedQuery, text: &str) {
    if parsed.raw_query.trim().is_empty() {
        parsed.raw_query = text.trim().to_string();
    }
    parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
