//! gongyak — a query-resolution pipeline for Korean election open data.
//!
//! One free-form question in, one normalized result set out. The pipeline
//! interprets the question into a structured [`types::ParsedQuery`]
//! (completion service with a deterministic rule fallback), adapts the
//! generic filters into the exact parameter shape the target NEC
//! (중앙선거관리위원회) data.go.kr service wants, resolves missing
//! identifiers through a two-stage chain when the target endpoint needs
//! them, fans a query out over several upstream calls when it spans
//! multiple elections or parties, and folds every upstream's envelope
//! quirks into one canonical record shape.
//!
//! ```no_run
//! use gongyak::{PipelineConfig, QueryPipeline};
//!
//! # async fn demo() -> gongyak::PipelineResult<()> {
//! let pipeline = QueryPipeline::from_config(&PipelineConfig::from_env())?;
//! let response = pipeline.run("2022년 지방선거 서울시장 당선자").await?;
//! for record in &response.data {
//!     println!("{record:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Without a `GONGYAK_SERVICE_KEY` the pipeline answers from built-in stub
//! payloads and flags responses `isStubData`, so the whole flow is
//! exercisable offline.

pub mod adapters;
pub mod chain;
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod elections;
pub mod error;
pub mod fanout;
pub mod interpreter;
pub mod normalize;
pub mod pipeline;
pub mod stub_data;
pub mod types;

pub use config::{PipelineConfig, SourceCatalog};
pub use error::{PipelineError, PipelineResult};
pub use interpreter::QueryInterpreter;
pub use pipeline::{PipelineFailure, PipelineResponse, QueryPipeline};
pub use types::{NormalizedRecord, ParsedQuery, QueryFilters, QueryIntent, SourceId};
