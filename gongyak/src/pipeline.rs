//! Pipeline façade: `interpret`, `execute`, and the combined `run`.
//!
//! `execute` adapts a parsed query for its source, validates, dispatches to
//! the direct / chained / fanned-out call shape that source needs, and
//! assembles one [`PipelineResponse`]. Recoverable failures (validation,
//! chain-stage misses, fully failed fan-outs, upstream error codes) are
//! carried as [`PipelineFailure`] values inside the response; only
//! configuration and transport faults surface as `PipelineError`.

use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapters::{self, AdaptedParams, CandidateParams, PledgeParams, StatsParams, WinnerParams};
use crate::chain::{ChainFailure, ChainOutcome, ChainResolver};
use crate::config::{PipelineConfig, SourceCatalog};
use crate::connector::{ApiConnector, ApiRequest, HttpConnector, StubConnector};
use crate::error::{PipelineError, PipelineResult};
use crate::fanout::{FanoutAggregator, FanoutReport};
use crate::interpreter::QueryInterpreter;
use crate::normalize::normalize_payload;
use crate::types::{NormalizedRecord, ParsedQuery, QueryIntent, SourceId};

/// Expected, recoverable failure carried inside a [`PipelineResponse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineFailure {
    /// Adapter-level missing or out-of-range parameters.
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
    /// One of the two chain stages missed; carries the stage and, for a
    /// roster miss, the names actually found.
    ChainStage(ChainFailure),
    /// The upstream answered with an error code or a non-2xx status.
    Upstream { message: String },
    /// Every fan-out combination failed (partial failures are metadata,
    /// not a `PipelineFailure`).
    Fanout {
        failed_keys: Vec<String>,
        errors: Vec<String>,
    },
}

impl PipelineFailure {
    /// One-line human-readable summary.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { errors, .. } => errors.join("; "),
            Self::ChainStage(failure) => {
                format!("{}: {}", failure.stage.as_str(), failure.message)
            }
            Self::Upstream { message } => message.clone(),
            Self::Fanout { errors, .. } => errors.join("; "),
        }
    }
}

/// Request bookkeeping attached to every response. `debug` carries the
/// `_inferred` trail (inside the adapted params), chain stage traces and
/// fan-out key lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    pub elapsed_ms: u64,
    pub total_count: u64,
    pub debug: Map<String, Value>,
}

/// The pipeline's answer to one query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub success: bool,
    pub data: Vec<NormalizedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<PipelineFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
    pub is_stub_data: bool,
    pub metadata: ResponseMeta,
}

pub struct QueryPipeline {
    catalog: SourceCatalog,
    connector: Box<dyn ApiConnector>,
    interpreter: QueryInterpreter,
}

impl QueryPipeline {
    pub fn new(
        catalog: SourceCatalog,
        connector: Box<dyn ApiConnector>,
        interpreter: QueryInterpreter,
    ) -> Self {
        Self {
            catalog,
            connector,
            interpreter,
        }
    }

    /// Default catalog plus a connector picked by config: live HTTP when a
    /// service key is present, stub payloads otherwise.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let catalog = SourceCatalog::with_defaults();
        let connector: Box<dyn ApiConnector> = if config.stub_mode() {
            info!("no service key configured, answering from stub payloads");
            Box::new(StubConnector::new())
        } else {
            Box::new(HttpConnector::new(catalog.clone(), config)?)
        };
        let interpreter = QueryInterpreter::from_config(&config.completion);
        Ok(Self::new(catalog, connector, interpreter))
    }

    pub async fn interpret(&self, text: &str) -> ParsedQuery {
        self.interpreter.interpret(text).await
    }

    /// Interpret and execute in one go; the interpreter's own debug record
    /// (which path ran, hashes, latency) joins the response metadata.
    pub async fn run(&self, text: &str) -> PipelineResult<PipelineResponse> {
        let interpretation = self.interpreter.interpret_with_debug(text).await;
        let mut extra = Map::new();
        extra.insert(
            "interpreter".to_string(),
            serde_json::to_value(&interpretation.debug).unwrap_or(Value::Null),
        );
        self.execute_with_debug(&interpretation.parsed, extra).await
    }

    pub async fn execute(&self, parsed: &ParsedQuery) -> PipelineResult<PipelineResponse> {
        self.execute_with_debug(parsed, Map::new()).await
    }

    async fn execute_with_debug(
        &self,
        parsed: &ParsedQuery,
        mut dbg: Map<String, Value>,
    ) -> PipelineResult<PipelineResponse> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        // Intent routing. Analyze/export queries that name a source still
        // boil down to a fetch; the rewrite is recorded so the routing
        // layer can message the difference. Crawl and PDF intents belong
        // to other subsystems entirely.
        match parsed.intent {
            QueryIntent::FetchApi => {}
            QueryIntent::AnalyzeData | QueryIntent::ExportData if parsed.source.id.is_some() => {
                dbg.insert(
                    "intentRewritten".to_string(),
                    json!({ "from": parsed.intent.as_str(), "to": QueryIntent::FetchApi.as_str() }),
                );
                debug!("rewrote intent {} to fetch_api", parsed.intent);
            }
            other => {
                return Err(PipelineError::UnsupportedIntent {
                    intent: other.as_str().to_string(),
                })
            }
        }

        let Some(source) = parsed.source.id else {
            // No catalogued source matched the question. Expected for
            // off-domain text, so a value rather than an error.
            return Ok(self.respond(
                None,
                Vec::new(),
                0,
                Some(PipelineFailure::Validation {
                    errors: vec![
                        "질문에서 조회할 데이터 소스를 찾지 못했습니다 (no data source resolved)"
                            .to_string(),
                    ],
                    warnings: Vec::new(),
                }),
                dbg,
                request_id,
                started,
            ));
        };
        // Unknown source id is a configuration fault, not a user mistake.
        self.catalog.get(source)?;

        let params = adapters::adapt(source, parsed);
        dbg.insert(
            "adaptedParams".to_string(),
            serde_json::to_value(&params).unwrap_or(Value::Null),
        );

        let validation = adapters::validate(&params);
        if !validation.valid {
            return Ok(self.respond(
                Some(source),
                Vec::new(),
                0,
                Some(PipelineFailure::Validation {
                    errors: validation.errors,
                    warnings: validation.warnings,
                }),
                dbg,
                request_id,
                started,
            ));
        }
        if !validation.warnings.is_empty() {
            dbg.insert(
                "validationWarnings".to_string(),
                json!(validation.warnings),
            );
        }

        let (mut data, total, failure) = match params {
            AdaptedParams::Pledge(p) => self.execute_pledge(&p, &mut dbg).await?,
            AdaptedParams::PartyPolicy(p) => {
                let report = FanoutAggregator::new(self.connector.as_ref())
                    .party_policies(&p)
                    .await;
                fanout_outcome(report, &mut dbg)
            }
            AdaptedParams::Candidate(p) => self.execute_roster(&p, &mut dbg).await?,
            AdaptedParams::Winner(p) => self.execute_winner(&p, &mut dbg).await?,
            AdaptedParams::Stats(p) => self.execute_stats(&p).await?,
        };

        if let Some(limit) = parsed.output.limit {
            if (limit as usize) < data.len() {
                data.truncate(limit as usize);
                dbg.insert("limitApplied".to_string(), json!(limit));
            }
        }

        Ok(self.respond(Some(source), data, total, failure, dbg, request_id, started))
    }

    async fn execute_pledge(
        &self,
        params: &PledgeParams,
        dbg: &mut Map<String, Value>,
    ) -> PipelineResult<(Vec<NormalizedRecord>, u64, Option<PipelineFailure>)> {
        // Direct call when the caller already knew the candidate id.
        if params.cnddt_id.is_some() {
            return self
                .fetch_direct(SourceId::Pledge, params.to_query())
                .await;
        }

        // sg_id/sg_typecode are guaranteed by validation at this point.
        let sg_id = params.sg_id.as_deref().unwrap_or_default();
        let sg_typecode = params.sg_typecode.as_deref().unwrap_or_default();
        let party_hint = params.party_hint.as_deref();

        if params.candidate_names.len() > 1 {
            let report = FanoutAggregator::new(self.connector.as_ref())
                .pledges(sg_id, sg_typecode, &params.candidate_names, party_hint)
                .await;
            let mut dbg_map = Map::new();
            let outcome = fanout_outcome(report, &mut dbg_map);
            dbg.extend(dbg_map);
            return Ok(outcome);
        }

        let Some(name) = params.candidate_names.first() else {
            // Validation normally catches this; hand-built params may not
            // have gone through it.
            return Ok((
                Vec::new(),
                0,
                Some(PipelineFailure::Validation {
                    errors: vec![
                        "specific candidate name required for pledge lookup".to_string(),
                    ],
                    warnings: Vec::new(),
                }),
            ));
        };
        let resolver = ChainResolver::new(self.connector.as_ref());
        match resolver.resolve(sg_id, sg_typecode, name, party_hint).await? {
            ChainOutcome::Resolved {
                candidate,
                records,
                total_count,
                trace,
            } => {
                dbg.insert(
                    "chain".to_string(),
                    json!({
                        "candidate": candidate,
                        "stages": trace,
                    }),
                );
                Ok((records, total_count, None))
            }
            ChainOutcome::Failed(failure) => {
                dbg.insert(
                    "chain".to_string(),
                    json!({ "failedStage": failure.stage.as_str() }),
                );
                Ok((Vec::new(), 0, Some(PipelineFailure::ChainStage(failure))))
            }
        }
    }

    async fn execute_roster(
        &self,
        params: &CandidateParams,
        dbg: &mut Map<String, Value>,
    ) -> PipelineResult<(Vec<NormalizedRecord>, u64, Option<PipelineFailure>)> {
        let (rows, total, failure) = self
            .fetch_direct(SourceId::Candidate, params.to_query())
            .await?;
        let Some(name) = &params.name_filter else {
            return Ok((rows, total, failure));
        };
        let filtered: Vec<NormalizedRecord> = rows
            .into_iter()
            .filter(|record| match record {
                NormalizedRecord::Candidate(c) => c.name.contains(name.as_str()),
                _ => true,
            })
            .collect();
        dbg.insert("nameFilter".to_string(), json!(name));
        let total = filtered.len() as u64;
        Ok((filtered, total, failure))
    }

    async fn execute_winner(
        &self,
        params: &WinnerParams,
        dbg: &mut Map<String, Value>,
    ) -> PipelineResult<(Vec<NormalizedRecord>, u64, Option<PipelineFailure>)> {
        let (rows, total, failure) = self
            .fetch_direct(SourceId::Winner, params.to_query())
            .await?;
        let before = rows.len();
        let filtered = params.apply_mode_filter(rows);
        if filtered.len() != before {
            dbg.insert(
                "voteShareFilter".to_string(),
                json!({ "before": before, "after": filtered.len() }),
            );
            let total = filtered.len() as u64;
            return Ok((filtered, total, failure));
        }
        Ok((filtered, total, failure))
    }

    async fn execute_stats(
        &self,
        params: &StatsParams,
    ) -> PipelineResult<(Vec<NormalizedRecord>, u64, Option<PipelineFailure>)> {
        self.fetch_direct(SourceId::Stats, params.to_query()).await
    }

    /// One upstream call, normalized. Error codes and non-2xx statuses come
    /// back as `PipelineFailure::Upstream`; transport faults propagate.
    async fn fetch_direct(
        &self,
        source: SourceId,
        query: Vec<(String, String)>,
    ) -> PipelineResult<(Vec<NormalizedRecord>, u64, Option<PipelineFailure>)> {
        let mut request = ApiRequest::new(source, source.endpoint());
        for (key, value) in query {
            request = request.param(&key, value);
        }
        let response = self.connector.fetch(&request).await?;
        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| format!("upstream {source} reported an error"));
            return Ok((Vec::new(), 0, Some(PipelineFailure::Upstream { message })));
        }
        let normalized = normalize_payload(source, &response.data);
        if !normalized.success {
            let message = normalized
                .error
                .unwrap_or_else(|| format!("upstream {source} reported an error"));
            return Ok((Vec::new(), 0, Some(PipelineFailure::Upstream { message })));
        }
        Ok((normalized.data, normalized.total_count, None))
    }

    #[allow(clippy::too_many_arguments)]
    fn respond(
        &self,
        source: Option<SourceId>,
        data: Vec<NormalizedRecord>,
        total_count: u64,
        failure: Option<PipelineFailure>,
        dbg: Map<String, Value>,
        request_id: String,
        started: Instant,
    ) -> PipelineResponse {
        PipelineResponse {
            success: failure.is_none(),
            data,
            failure,
            source,
            is_stub_data: self.connector.is_stub(),
            metadata: ResponseMeta {
                request_id,
                elapsed_ms: started.elapsed().as_millis() as u64,
                total_count,
                debug: dbg,
            },
        }
    }
}

/// Fold a fan-out report into the common dispatch shape. Partial failures
/// stay in debug metadata; only an all-failed run becomes a failure.
fn fanout_outcome(
    report: FanoutReport,
    dbg: &mut Map<String, Value>,
) -> (Vec<NormalizedRecord>, u64, Option<PipelineFailure>) {
    dbg.insert(
        "fanout".to_string(),
        json!({
            "successKeys": report.success_keys,
            "failedKeys": report.failed_keys,
            "combinationsAttempted": report.combinations_attempted,
        }),
    );
    let total = report.items.len() as u64;
    if report.success {
        (report.items, total, None)
    } else {
        (
            Vec::new(),
            0,
            Some(PipelineFailure::Fanout {
                failed_keys: report.failed_keys,
                errors: report.errors,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputOptions, QueryFilters, SourceRef};

    fn stub_pipeline() -> QueryPipeline {
        QueryPipeline::new(
            SourceCatalog::with_defaults(),
            Box::new(StubConnector::new()),
            QueryInterpreter::rule_only(),
        )
    }

    #[tokio::test]
    async fn winner_question_runs_end_to_end() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("2022년 지방선거 서울시장 당선자").await.unwrap();
        assert!(response.success);
        assert_eq!(response.source, Some(SourceId::Winner));
        assert!(response.is_stub_data);
        assert!(!response.data.is_empty());
        let adapted = &response.metadata.debug["adaptedParams"];
        assert_eq!(adapted["sgId"], "20220601");
        assert_eq!(adapted["sgTypecode"], "3");
    }

    #[tokio::test]
    async fn single_candidate_pledge_goes_through_the_chain() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("윤석열 공약 알려줘").await.unwrap();
        assert!(response.success);
        assert_eq!(response.source, Some(SourceId::Pledge));
        let chain = &response.metadata.debug["chain"];
        assert_eq!(chain["candidate"]["cnddtId"], "100089895");
        match &response.data[0] {
            NormalizedRecord::Pledge(p) => assert_eq!(p.candidate_id, "100089895"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn vote_share_question_post_filters_winners() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("윤석열 득표율 알려줘").await.unwrap();
        assert!(response.success);
        assert_eq!(response.data.len(), 1);
        match &response.data[0] {
            NormalizedRecord::Winner(w) => {
                assert_eq!(w.name, "윤석열");
                assert!(w.vote_rate.is_some());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bare_policy_question_fans_out_over_major_parties() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("공약 알려줘").await.unwrap();
        assert!(response.success);
        assert_eq!(response.source, Some(SourceId::PartyPolicy));
        let fanout = &response.metadata.debug["fanout"];
        assert_eq!(fanout["successKeys"].as_array().unwrap().len(), 3);
        assert!(fanout["failedKeys"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn analyze_intent_with_source_is_rewritten() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("정당 공약 비교 분석").await.unwrap();
        assert!(response.success);
        let rewrite = &response.metadata.debug["intentRewritten"];
        assert_eq!(rewrite["from"], "analyze_data");
        assert_eq!(rewrite["to"], "fetch_api");
    }

    #[tokio::test]
    async fn crawl_intent_is_unsupported() {
        let pipeline = stub_pipeline();
        let err = pipeline.run("선관위 사이트 크롤링").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedIntent { ref intent } if intent == "crawl_site"
        ));
    }

    #[tokio::test]
    async fn off_domain_question_fails_as_a_value() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("날씨 데이터 가져와").await.unwrap();
        assert!(!response.success);
        assert!(response.source.is_none());
        match response.failure {
            Some(PipelineFailure::Validation { ref errors, .. }) => {
                assert!(errors[0].contains("no data source resolved"), "{errors:?}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pledge_without_candidate_name_reports_what_is_missing() {
        let pipeline = stub_pipeline();
        let parsed = ParsedQuery {
            raw_query: "공약".to_string(),
            intent: QueryIntent::FetchApi,
            confidence: 1.0,
            source: SourceRef::api(SourceId::Pledge),
            filters: QueryFilters::default(),
            output: OutputOptions::default(),
        };
        let response = pipeline.execute(&parsed).await.unwrap();
        assert!(!response.success);
        match response.failure {
            Some(PipelineFailure::Validation { ref errors, .. }) => {
                assert!(
                    errors.iter().any(|e| e.contains("candidate name required")),
                    "{errors:?}"
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn output_limit_truncates_data() {
        let pipeline = stub_pipeline();
        let mut parsed = ParsedQuery::fetch("2022년 대선 후보", SourceId::Candidate);
        parsed.filters.sg_id = Some("20220309".to_string());
        parsed.output.limit = Some(2);
        let response = pipeline.execute(&parsed).await.unwrap();
        assert!(response.success);
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.metadata.debug["limitApplied"], 2);
    }

    #[tokio::test]
    async fn roster_name_filter_narrows_client_side() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("2022년 대선 심상정 후보").await.unwrap();
        assert!(response.success);
        assert_eq!(response.source, Some(SourceId::Candidate));
        assert_eq!(response.data.len(), 1);
        match &response.data[0] {
            NormalizedRecord::Candidate(c) => assert_eq!(c.name, "심상정"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn metadata_carries_request_bookkeeping() {
        let pipeline = stub_pipeline();
        let response = pipeline.run("최근 총선 투표율 통계").await.unwrap();
        assert!(response.success);
        assert_eq!(response.source, Some(SourceId::Stats));
        assert!(!response.metadata.request_id.is_empty());
        assert!(response.metadata.debug.contains_key("interpreter"));
        assert!(response.metadata.debug.contains_key("adaptedParams"));
    }
}
