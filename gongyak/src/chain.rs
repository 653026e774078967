//! Name-to-manifesto chain resolution.
//!
//! The pledge endpoint keys on `cnddtId`, which nobody types. Stage 1 pulls
//! the candidate roster for the election, matches the requested name and
//! settles on one id; stage 2 fetches that candidate's pledges. Either stage
//! can fail without taking the pipeline down, so failures are returned as
//! [`ChainFailure`] values rather than errors.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::connector::{ApiConnector, ApiRequest};
use crate::error::PipelineResult;
use crate::normalize::normalize_payload;
use crate::types::{CandidateRecord, NormalizedRecord, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStage {
    CandidateLookup,
    ManifestoLookup,
}

impl ChainStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CandidateLookup => "candidate_lookup",
            Self::ManifestoLookup => "manifesto_lookup",
        }
    }
}

/// Terminal stage failure. A roster miss carries the names that were
/// actually on the roster so the caller can suggest alternatives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainFailure {
    pub stage: ChainStage,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates_found: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCandidate {
    #[serde(rename = "cnddtId")]
    pub cnddt_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Resolved {
        candidate: ResolvedCandidate,
        records: Vec<NormalizedRecord>,
        total_count: u64,
        trace: Vec<String>,
    },
    Failed(ChainFailure),
}

impl ChainOutcome {
    fn failed(stage: ChainStage, message: impl Into<String>) -> Self {
        Self::Failed(ChainFailure {
            stage,
            message: message.into(),
            candidates_found: Vec::new(),
        })
    }
}

pub struct ChainResolver<'a> {
    connector: &'a dyn ApiConnector,
}

impl<'a> ChainResolver<'a> {
    pub fn new(connector: &'a dyn ApiConnector) -> Self {
        Self { connector }
    }

    /// Resolve `candidate_name` within `(sg_id, sg_typecode)` and fetch the
    /// matched candidate's pledges. Stage 2 runs only after stage 1 settles
    /// on exactly one id; no retries on either stage.
    pub async fn resolve(
        &self,
        sg_id: &str,
        sg_typecode: &str,
        candidate_name: &str,
        party_hint: Option<&str>,
    ) -> PipelineResult<ChainOutcome> {
        let mut trace = Vec::new();

        let mut roster_request = ApiRequest::new(SourceId::Candidate, SourceId::Candidate.endpoint())
            .param("sgId", sg_id)
            .param("sgTypecode", sg_typecode);
        if sg_typecode == "1" {
            // Presidential races have a single nationwide district.
            roster_request = roster_request.param("sggName", "대한민국");
        }

        let roster_response = self.connector.fetch(&roster_request).await?;
        if !roster_response.success {
            let message = roster_response
                .error
                .unwrap_or_else(|| "candidate roster fetch failed".to_string());
            return Ok(ChainOutcome::failed(ChainStage::CandidateLookup, message));
        }
        let roster = normalize_payload(SourceId::Candidate, &roster_response.data);
        if !roster.success {
            let message = roster
                .error
                .unwrap_or_else(|| "candidate roster fetch failed".to_string());
            return Ok(ChainOutcome::failed(ChainStage::CandidateLookup, message));
        }

        let rows: Vec<CandidateRecord> = roster
            .data
            .into_iter()
            .filter_map(|record| match record {
                NormalizedRecord::Candidate(c) => Some(c),
                _ => None,
            })
            .collect();
        trace.push(format!(
            "candidate_lookup: {} roster rows for {}/{}",
            rows.len(),
            sg_id,
            sg_typecode
        ));

        let mut matches: Vec<&CandidateRecord> = rows
            .iter()
            .filter(|c| c.name.contains(candidate_name))
            .collect();
        if matches.is_empty() {
            return Ok(ChainOutcome::Failed(ChainFailure {
                stage: ChainStage::CandidateLookup,
                message: format!(
                    "'{candidate_name}' 후보를 {sg_id} 후보자 명부에서 찾지 못했습니다"
                ),
                candidates_found: rows.iter().map(|c| c.name.clone()).collect(),
            }));
        }

        if matches.len() > 1 {
            if let Some(party) = party_hint {
                let by_party: Vec<&CandidateRecord> = matches
                    .iter()
                    .copied()
                    .filter(|c| c.party_name.contains(party))
                    .collect();
                if !by_party.is_empty() {
                    trace.push(format!(
                        "candidate_lookup: narrowed {} name matches by party '{party}'",
                        matches.len()
                    ));
                    matches = by_party;
                }
            }
        }

        matches.sort_by(|a, b| candidate_id_order(&a.candidate_id, &b.candidate_id));
        let chosen = match matches.first() {
            Some(candidate) => (*candidate).clone(),
            None => {
                return Ok(ChainOutcome::failed(
                    ChainStage::CandidateLookup,
                    format!("'{candidate_name}' matched no roster entry"),
                ))
            }
        };
        if matches.len() > 1 {
            trace.push(format!(
                "candidate_lookup: {} candidates left, picked smallest id {}",
                matches.len(),
                chosen.candidate_id
            ));
        }
        debug!(
            "resolved '{}' to cnddtId {} ({})",
            candidate_name, chosen.candidate_id, chosen.party_name
        );

        let pledge_request = ApiRequest::new(SourceId::Pledge, SourceId::Pledge.endpoint())
            .param("sgId", sg_id)
            .param("sgTypecode", sg_typecode)
            .param("cnddtId", &chosen.candidate_id);
        let pledge_response = self.connector.fetch(&pledge_request).await?;
        if !pledge_response.success {
            let message = pledge_response
                .error
                .unwrap_or_else(|| "pledge fetch failed".to_string());
            return Ok(ChainOutcome::failed(ChainStage::ManifestoLookup, message));
        }
        let pledges = normalize_payload(SourceId::Pledge, &pledge_response.data);
        if !pledges.success {
            let message = pledges
                .error
                .unwrap_or_else(|| "pledge fetch failed".to_string());
            return Ok(ChainOutcome::failed(ChainStage::ManifestoLookup, message));
        }
        trace.push(format!(
            "manifesto_lookup: {} records for cnddtId {}",
            pledges.data.len(),
            chosen.candidate_id
        ));

        let candidate = ResolvedCandidate {
            cnddt_id: chosen.candidate_id.clone(),
            name: chosen.name.clone(),
            party_name: (!chosen.party_name.is_empty()).then(|| chosen.party_name.clone()),
        };
        Ok(ChainOutcome::Resolved {
            candidate,
            records: pledges.data,
            total_count: pledges.total_count,
            trace,
        })
    }
}

/// Numeric order when both ids parse as numbers, lexical otherwise.
fn candidate_id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{ConnectorResponse, ResponseMetadata};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedConnector {
        responses: Mutex<VecDeque<ConnectorResponse>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedConnector {
        fn new(responses: Vec<ConnectorResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn ok(payloads: Vec<Value>) -> Self {
            Self::new(
                payloads
                    .into_iter()
                    .map(|data| ConnectorResponse::ok(data, ResponseMetadata::default()))
                    .collect(),
            )
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiConnector for ScriptedConnector {
        async fn fetch(&self, request: &ApiRequest) -> PipelineResult<ConnectorResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left"))
        }
    }

    fn envelope(items: Value) -> Value {
        let count = items.as_array().map(|a| a.len()).unwrap_or(0);
        json!({
            "response": {
                "header": { "resultCode": "INFO-00", "resultMsg": "NORMAL SERVICE" },
                "body": { "items": { "item": items }, "totalCount": count }
            }
        })
    }

    fn roster_row(id: &str, name: &str, party: &str) -> Value {
        json!({
            "huboid": id,
            "sgId": "20220309",
            "sgTypecode": "1",
            "name": name,
            "jdName": party
        })
    }

    fn pledge_row(id: &str) -> Value {
        json!({
            "cnddtId": id,
            "sgId": "20220309",
            "sgTypecode": "1",
            "krName": "윤석열",
            "partyName": "국민의힘",
            "prmsCnt": 1,
            "prmsRealmName1": "경제",
            "prmsTitle1": "규제 개혁",
            "prmsCont1": "신산업 규제 완화"
        })
    }

    #[tokio::test]
    async fn stage_two_reuses_stage_one_id() {
        let connector = ScriptedConnector::ok(vec![
            envelope(json!([
                roster_row("100089895", "윤석열", "국민의힘"),
                roster_row("100089893", "이재명", "더불어민주당"),
            ])),
            envelope(json!([pledge_row("100089895")])),
        ]);
        let resolver = ChainResolver::new(&connector);
        let outcome = resolver
            .resolve("20220309", "1", "윤석열", None)
            .await
            .unwrap();

        let requests = connector.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].get_param("sggName"), Some("대한민국"));
        assert_eq!(requests[1].get_param("cnddtId"), Some("100089895"));

        match outcome {
            ChainOutcome::Resolved {
                candidate, records, ..
            } => {
                assert_eq!(candidate.cnddt_id, "100089895");
                assert_eq!(candidate.party_name.as_deref(), Some("국민의힘"));
                assert_eq!(records.len(), 1);
            }
            ChainOutcome::Failed(failure) => panic!("unexpected failure: {failure:?}"),
        }
    }

    #[tokio::test]
    async fn roster_miss_reports_actual_names() {
        let connector = ScriptedConnector::ok(vec![envelope(json!([
            roster_row("100089895", "윤석열", "국민의힘"),
            roster_row("100089893", "이재명", "더불어민주당"),
        ]))]);
        let resolver = ChainResolver::new(&connector);
        let outcome = resolver
            .resolve("20220309", "1", "김철수", None)
            .await
            .unwrap();

        match outcome {
            ChainOutcome::Failed(failure) => {
                assert_eq!(failure.stage, ChainStage::CandidateLookup);
                assert!(failure.message.contains("김철수"), "{}", failure.message);
                assert_eq!(failure.candidates_found, vec!["윤석열", "이재명"]);
            }
            ChainOutcome::Resolved { .. } => panic!("expected a roster miss"),
        }
        assert_eq!(connector.requests().len(), 1);
    }

    #[tokio::test]
    async fn same_name_resolves_to_smallest_id() {
        let connector = ScriptedConnector::ok(vec![
            envelope(json!([
                roster_row("100200077", "김민수", "무소속"),
                roster_row("100200012", "김민수", "더불어민주당"),
            ])),
            envelope(json!([pledge_row("100200012")])),
        ]);
        let resolver = ChainResolver::new(&connector);
        let outcome = resolver
            .resolve("20220309", "1", "김민수", None)
            .await
            .unwrap();

        match outcome {
            ChainOutcome::Resolved {
                candidate, trace, ..
            } => {
                assert_eq!(candidate.cnddt_id, "100200012");
                assert!(trace.iter().any(|t| t.contains("smallest id")), "{trace:?}");
            }
            ChainOutcome::Failed(failure) => panic!("unexpected failure: {failure:?}"),
        }
    }

    #[tokio::test]
    async fn party_hint_beats_smallest_id() {
        let connector = ScriptedConnector::ok(vec![
            envelope(json!([
                roster_row("100200012", "김민수", "더불어민주당"),
                roster_row("100200077", "김민수", "국민의힘"),
            ])),
            envelope(json!([pledge_row("100200077")])),
        ]);
        let resolver = ChainResolver::new(&connector);
        let outcome = resolver
            .resolve("20220309", "1", "김민수", Some("국민의힘"))
            .await
            .unwrap();

        match outcome {
            ChainOutcome::Resolved { candidate, .. } => {
                assert_eq!(candidate.cnddt_id, "100200077");
            }
            ChainOutcome::Failed(failure) => panic!("unexpected failure: {failure:?}"),
        }
    }

    #[tokio::test]
    async fn manifesto_stage_failure_is_a_value() {
        let connector = ScriptedConnector::new(vec![
            ConnectorResponse::ok(
                envelope(json!([roster_row("100089895", "윤석열", "국민의힘")])),
                ResponseMetadata::default(),
            ),
            ConnectorResponse {
                success: false,
                data: Value::Null,
                error: Some("HTTP 500 from public_data_pledge".to_string()),
                metadata: ResponseMetadata {
                    status_code: 500,
                    total_count: None,
                },
            },
        ]);
        let resolver = ChainResolver::new(&connector);
        let outcome = resolver
            .resolve("20220309", "1", "윤석열", None)
            .await
            .unwrap();

        match outcome {
            ChainOutcome::Failed(failure) => {
                assert_eq!(failure.stage, ChainStage::ManifestoLookup);
                assert!(failure.message.contains("HTTP 500"), "{}", failure.message);
                assert!(failure.candidates_found.is_empty());
            }
            ChainOutcome::Resolved { .. } => panic!("expected a stage-two failure"),
        }
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() {
        let roster = envelope(json!([
            roster_row("100200077", "김민수", "무소속"),
            roster_row("100200012", "김민수", "더불어민주당"),
        ]));
        let pledges = envelope(json!([pledge_row("100200012")]));

        let mut picked = Vec::new();
        for _ in 0..3 {
            let connector = ScriptedConnector::ok(vec![roster.clone(), pledges.clone()]);
            let resolver = ChainResolver::new(&connector);
            match resolver.resolve("20220309", "1", "김민수", None).await.unwrap() {
                ChainOutcome::Resolved { candidate, .. } => picked.push(candidate.cnddt_id),
                ChainOutcome::Failed(failure) => panic!("unexpected failure: {failure:?}"),
            }
        }
        assert!(picked.iter().all(|id| id == "100200012"), "{picked:?}");
    }
}
