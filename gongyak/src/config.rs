//! Pipeline configuration and the upstream source catalog.
//!
//! The catalog is built once at startup (defaults, TOML, or code) and is
//! read-only afterwards; request handling only ever looks sources up by id.
//! Service keys are taken from the environment and are never logged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::SourceId;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// data.go.kr service key. When absent the pipeline runs against the
    /// built-in stub payloads and marks every response `isStubData`.
    pub service_key: Option<String>,
    /// Per-call upstream timeout in seconds.
    pub timeout_seconds: u64,
    /// Page size requested from the upstream (`numOfRows`).
    pub num_of_rows: u32,
    /// Completion service used by the query interpreter.
    pub completion: CompletionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            service_key: None,
            timeout_seconds: 30,
            num_of_rows: 100,
            completion: CompletionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a config from the environment. `GONGYAK_SERVICE_KEY` wins over
    /// the generic `DATA_GO_KR_SERVICE_KEY`; completion settings come from
    /// `GONGYAK_LLM_*` and `OPENAI_API_KEY`.
    pub fn from_env() -> Self {
        let service_key = std::env::var("GONGYAK_SERVICE_KEY")
            .or_else(|_| std::env::var("DATA_GO_KR_SERVICE_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self {
            service_key,
            completion: CompletionConfig::from_env(),
            ..Self::default()
        }
    }

    /// Parse a TOML config document. Unknown provider names and malformed
    /// documents are configuration errors, not fallbacks.
    pub fn from_toml_str(doc: &str) -> PipelineResult<Self> {
        toml::from_str(doc).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    pub fn stub_mode(&self) -> bool {
        self.service_key.is_none()
    }
}

/// Completion provider selection for the interpreter's primary path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProviderKind {
    /// Deterministic canned interpreter, no network.
    #[default]
    Stub,
    /// OpenAI-compatible chat completion endpoint.
    OpenAi,
}

/// Configuration for the external completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: CompletionProviderKind,
    /// Model identifier sent to the completion endpoint.
    pub model: String,
    /// API key (usually loaded from env, never logged).
    pub api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    /// Sampling temperature. Kept at 0 so interpretations stay reproducible.
    pub temperature: f64,
    /// Completion call timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProviderKind::Stub,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            timeout_seconds: 60,
        }
    }
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(provider) = std::env::var("GONGYAK_LLM_PROVIDER") {
            cfg.provider = match provider.to_lowercase().as_str() {
                "openai" => CompletionProviderKind::OpenAi,
                _ => CompletionProviderKind::Stub,
            };
        }
        if let Ok(model) = std::env::var("GONGYAK_LLM_MODEL") {
            cfg.model = model;
        }
        if let Ok(base_url) = std::env::var("GONGYAK_LLM_BASE_URL") {
            cfg.base_url = Some(base_url);
        }
        cfg.api_key = std::env::var("GONGYAK_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();
        // A provider was requested but no key exists; fall back to the stub
        // rather than fail every interpretation.
        if cfg.provider == CompletionProviderKind::OpenAi && cfg.api_key.is_none() {
            cfg.provider = CompletionProviderKind::Stub;
        }
        cfg
    }
}

/// Where the auth credential is injected on an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthLocation {
    Query,
    Header,
}

/// Auth parameter spec for one upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Parameter or header name carrying the credential.
    pub param: String,
    pub location: AuthLocation,
}

impl AuthSpec {
    fn query(param: &str) -> Self {
        Self {
            param: param.to_string(),
            location: AuthLocation::Query,
        }
    }
}

/// One upstream source family: base URL, its named operations, auth and
/// response-format override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    pub base_url: String,
    /// Logical endpoint name → upstream operation path.
    pub endpoints: IndexMap<String, String>,
    pub auth: AuthSpec,
    /// Fixed query pair forcing the payload format (e.g. `resultType=json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<(String, String)>,
}

impl SourceConfig {
    /// Full URL for a named endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> PipelineResult<String> {
        let path = self
            .endpoints
            .get(endpoint)
            .ok_or_else(|| PipelineError::MissingEndpoint {
                source_id: self.id.as_str().to_string(),
                endpoint: endpoint.to_string(),
            })?;
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Immutable id → source-config map, injected into every component that
/// needs upstream knowledge. There is no global registry.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: IndexMap<SourceId, SourceConfig>,
}

const NEC_API_ROOT: &str = "http://apis.data.go.kr/9760000";

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of National Election Commission open-data services this
    /// pipeline ships with.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.insert(SourceConfig {
            id: SourceId::Pledge,
            base_url: format!("{NEC_API_ROOT}/ElecPrmsInfoInqireService"),
            endpoints: IndexMap::from([(
                "pledges".to_string(),
                "getCnddtElecPrmsInfoInqire".to_string(),
            )]),
            auth: AuthSpec::query("serviceKey"),
            response_format: Some(("resultType".to_string(), "json".to_string())),
        });
        catalog.insert(SourceConfig {
            id: SourceId::PartyPolicy,
            base_url: format!("{NEC_API_ROOT}/ElecPrmsInfoInqireService"),
            endpoints: IndexMap::from([(
                "policies".to_string(),
                "getPartyPlcPblprmsInfoInqire".to_string(),
            )]),
            auth: AuthSpec::query("serviceKey"),
            response_format: Some(("resultType".to_string(), "json".to_string())),
        });
        catalog.insert(SourceConfig {
            id: SourceId::Candidate,
            base_url: format!("{NEC_API_ROOT}/PofelcddInfoInqireService"),
            endpoints: IndexMap::from([(
                "roster".to_string(),
                "getPofelcddRegistSttusInfoInqire".to_string(),
            )]),
            auth: AuthSpec::query("serviceKey"),
            response_format: Some(("resultType".to_string(), "json".to_string())),
        });
        catalog.insert(SourceConfig {
            id: SourceId::Winner,
            base_url: format!("{NEC_API_ROOT}/WinnerInfoInqireService2"),
            endpoints: IndexMap::from([(
                "winners".to_string(),
                "getWinnerInfoInqire".to_string(),
            )]),
            auth: AuthSpec::query("serviceKey"),
            response_format: Some(("resultType".to_string(), "json".to_string())),
        });
        catalog.insert(SourceConfig {
            id: SourceId::Stats,
            base_url: format!("{NEC_API_ROOT}/VoteSttusInfoInqireService"),
            endpoints: IndexMap::from([(
                "turnout".to_string(),
                "getVoteSttusInfoInqire".to_string(),
            )]),
            auth: AuthSpec::query("serviceKey"),
            response_format: Some(("resultType".to_string(), "json".to_string())),
        });
        catalog
    }

    /// Register or replace a source. Only meaningful before the catalog is
    /// handed to the pipeline.
    pub fn insert(&mut self, config: SourceConfig) {
        self.sources.insert(config.id, config);
    }

    pub fn get(&self, id: SourceId) -> PipelineResult<&SourceConfig> {
        self.sources
            .get(&id)
            .ok_or_else(|| PipelineError::UnknownSource(id.as_str().to_string()))
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
