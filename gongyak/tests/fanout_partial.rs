//! Fan-out behavior with a flaky upstream: a key that fails for one
//! combination but succeeds for another counts as succeeded, and only a
//! fully failed fan-out fails the whole query.

use async_trait::async_trait;
use serde_json::Value;

use gongyak::adapters::PartyPolicyParams;
use gongyak::config::SourceCatalog;
use gongyak::connector::{ApiConnector, ApiRequest, ConnectorResponse, ResponseMetadata};
use gongyak::error::PipelineResult;
use gongyak::fanout::FanoutAggregator;
use gongyak::pipeline::PipelineFailure;
use gongyak::{stub_data, QueryInterpreter, QueryPipeline};

const MAJOR_PARTIES: [&str; 3] = ["더불어민주당", "국민의힘", "정의당"];

/// Answers from stub payloads except for one scripted (party, election)
/// combination, which comes back as an upstream 500.
struct FlakyConnector {
    fail_party: &'static str,
    fail_sg_id: &'static str,
}

#[async_trait]
impl ApiConnector for FlakyConnector {
    async fn fetch(&self, request: &ApiRequest) -> PipelineResult<ConnectorResponse> {
        if request.get_param("partyName") == Some(self.fail_party)
            && request.get_param("sgId") == Some(self.fail_sg_id)
        {
            return Ok(ConnectorResponse {
                success: false,
                data: Value::Null,
                error: Some("HTTP 500 Internal Server Error".to_string()),
                metadata: ResponseMetadata {
                    status_code: 500,
                    total_count: None,
                },
            });
        }
        Ok(ConnectorResponse::ok(
            stub_data::payload_for(request),
            ResponseMetadata {
                status_code: 200,
                total_count: None,
            },
        ))
    }
}

/// Every upstream call comes back as a 500.
struct DeadConnector;

#[async_trait]
impl ApiConnector for DeadConnector {
    async fn fetch(&self, _request: &ApiRequest) -> PipelineResult<ConnectorResponse> {
        Ok(ConnectorResponse {
            success: false,
            data: Value::Null,
            error: Some("HTTP 503 Service Unavailable".to_string()),
            metadata: ResponseMetadata {
                status_code: 503,
                total_count: None,
            },
        })
    }
}

fn two_election_params() -> PartyPolicyParams {
    PartyPolicyParams {
        sg_ids: vec!["20220309".to_string(), "20240410".to_string()],
        party_names: MAJOR_PARTIES.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn key_failing_in_one_election_but_succeeding_in_another_counts_as_succeeded() {
    let connector = FlakyConnector {
        fail_party: "정의당",
        fail_sg_id: "20220309",
    };
    let report = FanoutAggregator::new(&connector)
        .party_policies(&two_election_params())
        .await;

    assert!(report.success);
    assert_eq!(report.combinations_attempted.len(), 6);
    assert!(report
        .combinations_attempted
        .contains(&"정의당 × 20220309".to_string()));
    assert!(report.success_keys.contains(&"정의당".to_string()));
    assert!(report.failed_keys.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("정의당"));

    // The failed combination's rows are simply absent.
    let jungui_rows = report
        .items
        .iter()
        .filter(|r| matches!(r, gongyak::NormalizedRecord::PartyPolicy(p) if p.party_name == "정의당"))
        .count();
    assert_eq!(jungui_rows, 1);
}

#[tokio::test]
async fn success_and_failed_key_sets_stay_disjoint() {
    let connector = FlakyConnector {
        fail_party: "국민의힘",
        fail_sg_id: "20240410",
    };
    let report = FanoutAggregator::new(&connector)
        .party_policies(&two_election_params())
        .await;

    for key in &report.failed_keys {
        assert!(
            !report.success_keys.contains(key),
            "{key} in both key sets"
        );
    }
    assert!(report.failed_keys.is_empty());
}

#[tokio::test]
async fn fully_failed_fanout_reports_every_key() {
    let report = FanoutAggregator::new(&DeadConnector)
        .party_policies(&two_election_params())
        .await;

    assert!(!report.success);
    assert!(report.items.is_empty());
    assert!(report.success_keys.is_empty());
    assert_eq!(report.failed_keys.len(), MAJOR_PARTIES.len());
    assert_eq!(report.errors.len(), 6);
}

#[tokio::test]
async fn pipeline_surfaces_fully_failed_fanout_as_failure_data() {
    let pipeline = QueryPipeline::new(
        SourceCatalog::with_defaults(),
        Box::new(DeadConnector),
        QueryInterpreter::rule_only(),
    );
    let response = pipeline.run("더불어민주당 정책 알려줘").await.expect("run");

    assert!(!response.success);
    match response.failure.expect("failure") {
        PipelineFailure::Fanout { failed_keys, .. } => {
            assert_eq!(failed_keys, vec!["더불어민주당".to_string()]);
        }
        other => panic!("wrong failure kind: {other:?}"),
    }
}
