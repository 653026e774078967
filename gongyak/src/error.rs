//! Pipeline error types.
//!
//! Only genuinely unexpected conditions are surfaced through
//! [`PipelineError`]: unknown source ids, missing endpoint configuration,
//! transport-level faults. Everything a caller is expected to recover from
//! (parameter validation, chain-stage misses, partial fan-out failures) is
//! returned as data — see `pipeline::PipelineFailure`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown source id '{0}'")]
    UnknownSource(String),

    #[error("source '{source_id}' has no endpoint named '{endpoint}'")]
    MissingEndpoint { source_id: String, endpoint: String },

    #[error("upstream transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion provider failure: {0}")]
    Completion(String),

    #[error("intent '{intent}' cannot be executed by the query pipeline")]
    UnsupportedIntent { intent: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
