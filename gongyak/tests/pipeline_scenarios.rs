//! End-to-end scenarios against the stub connector, driven through the
//! stubbed completion path so interpretation, adaptation, chaining and
//! normalization are all exercised together.

use gongyak::adapters::{self, AdaptedParams};
use gongyak::connector::ApiRequest;
use gongyak::elections::{self, ElectionType};
use gongyak::normalize::normalize_payload;
use gongyak::{stub_data, NormalizedRecord, ParsedQuery, PipelineConfig, QueryPipeline, SourceId};

fn stub_pipeline() -> QueryPipeline {
    // Default config: no service key (stub connector), stub completion
    // provider, so the full LLM-shaped path runs offline.
    QueryPipeline::from_config(&PipelineConfig::default()).expect("stub pipeline")
}

fn assert_known_election(sg_id: &str, sg_typecode: Option<&str>) {
    let election = elections::by_sg_id(sg_id)
        .unwrap_or_else(|| panic!("inferred unknown election id {sg_id}"));
    if let Some(code) = sg_typecode {
        let t = ElectionType::from_code(code)
            .unwrap_or_else(|| panic!("inferred unknown typecode {code}"));
        assert!(
            election.holds(t),
            "typecode {code} inconsistent with election {sg_id}"
        );
    }
}

#[test]
fn every_adapter_fills_election_identity_from_nothing() {
    // Filters carry no sgId at all; inference must still land on a known
    // election with a consistent typecode.
    for source in SourceId::all() {
        let parsed = ParsedQuery::fetch("자료 보여줘", source);
        let params = adapters::adapt(source, &parsed);
        match &params {
            AdaptedParams::Pledge(p) => {
                assert_known_election(p.sg_id.as_deref().expect("sgId"), p.sg_typecode.as_deref());
            }
            AdaptedParams::PartyPolicy(p) => {
                assert!(!p.sg_ids.is_empty(), "party policy inferred no election");
                for sg_id in &p.sg_ids {
                    assert_known_election(sg_id, None);
                }
            }
            AdaptedParams::Candidate(p) => {
                assert_known_election(p.sg_id.as_deref().expect("sgId"), p.sg_typecode.as_deref());
            }
            AdaptedParams::Winner(p) => {
                assert_known_election(p.sg_id.as_deref().expect("sgId"), p.sg_typecode.as_deref());
            }
            AdaptedParams::Stats(p) => {
                assert_known_election(p.sg_id.as_deref().expect("sgId"), p.sg_typecode.as_deref());
            }
        }
        assert!(
            !params.trail().is_empty(),
            "{source}: inference left no audit trail"
        );
    }
}

#[test]
fn normalization_is_idempotent() {
    let request = ApiRequest::new(SourceId::Pledge, "pledges")
        .param("sgId", "20220309")
        .param("sgTypecode", "1");
    let first = normalize_payload(SourceId::Pledge, &stub_data::payload_for(&request));
    assert!(first.success);
    assert!(!first.data.is_empty());

    let reserialized = serde_json::to_value(&first.data).expect("serialize");
    let second = normalize_payload(SourceId::Pledge, &reserialized);
    assert!(second.success);
    assert_eq!(first.data, second.data);
}

#[tokio::test]
async fn winner_scenario_resolves_election_region_and_data() {
    let pipeline = stub_pipeline();
    let parsed = pipeline.interpret("2022년 지방선거 서울시장 당선자").await;
    assert_eq!(parsed.source.id, Some(SourceId::Winner));
    assert_eq!(parsed.filters.region.as_ref().expect("region").sido, "서울");

    let response = pipeline.execute(&parsed).await.expect("execute");
    assert!(response.success);
    assert!(response.is_stub_data);
    let adapted = &response.metadata.debug["adaptedParams"];
    assert_eq!(adapted["sgId"], "20220601");
    assert_eq!(adapted["sgTypecode"], "3");
    assert!(response
        .data
        .iter()
        .all(|r| matches!(r, NormalizedRecord::Winner(_))));
}

#[tokio::test]
async fn bare_pledge_question_is_low_confidence_party_policy() {
    let pipeline = stub_pipeline();
    let parsed = pipeline.interpret("공약 알려줘").await;
    assert!(parsed.confidence <= 0.7 + f64::EPSILON, "{}", parsed.confidence);
    assert_eq!(parsed.source.id, Some(SourceId::PartyPolicy));

    let response = pipeline.execute(&parsed).await.expect("execute");
    assert!(response.success);
    let adapted = &response.metadata.debug["adaptedParams"];
    assert_eq!(adapted["_queryAllMajorParties"], true);
}

#[tokio::test]
async fn pledge_chain_reuses_the_resolved_candidate_id() {
    let pipeline = stub_pipeline();
    let response = pipeline.run("2022년 대통령선거 윤석열 공약").await.expect("run");
    assert!(response.success);
    assert_eq!(response.source, Some(SourceId::Pledge));

    let resolved = response.metadata.debug["chain"]["candidate"]["cnddtId"]
        .as_str()
        .expect("resolved id")
        .to_string();
    match &response.data[0] {
        NormalizedRecord::Pledge(p) => {
            assert_eq!(p.candidate_id, resolved);
            assert_eq!(p.candidate_name, "윤석열");
            assert!(!p.pledges.is_empty());
        }
        other => panic!("wrong variant: {other:?}"),
    }
}

#[tokio::test]
async fn date_range_spanning_elections_fans_out_and_tags_items() {
    let pipeline = stub_pipeline();
    let response = pipeline
        .run("2022년~2024년 정당 정책 알려줘")
        .await
        .expect("run");
    assert!(response.success);
    assert_eq!(response.source, Some(SourceId::PartyPolicy));

    let fanout = &response.metadata.debug["fanout"];
    // 3 elections in range × 3 major parties; the 2022 local election has
    // no party-policy rows, which is "no data", not a failure.
    assert_eq!(
        fanout["combinationsAttempted"]
            .as_array()
            .expect("combination list")
            .len(),
        9
    );
    assert_eq!(fanout["successKeys"].as_array().expect("keys").len(), 3);
    assert!(fanout["failedKeys"].as_array().expect("keys").is_empty());

    assert_eq!(response.data.len(), 6);
    for record in &response.data {
        assert!(
            matches!(record.sg_id(), "20220309" | "20240410"),
            "untagged record: {record:?}"
        );
    }
}

#[tokio::test]
async fn turnout_statistics_come_back_per_region() {
    let pipeline = stub_pipeline();
    let response = pipeline.run("2024년 총선 투표율 통계").await.expect("run");
    assert!(response.success);
    assert_eq!(response.source, Some(SourceId::Stats));
    assert_eq!(response.data.len(), 3);
    match &response.data[0] {
        NormalizedRecord::Statistic(s) => {
            assert_eq!(s.sg_id, "20240410");
            assert!(s.elector_count.is_some());
        }
        other => panic!("wrong variant: {other:?}"),
    }
}
