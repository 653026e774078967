//! Read-only concurrent diagnostics.
//!
//! These helpers have no ordering dependency between calls, so unlike the
//! fan-out path they run concurrently and collect every result, failures
//! included. A failed probe never cancels the others.

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::chain::{ChainOutcome, ChainResolver, ChainStage};
use crate::connector::{ApiConnector, ApiRequest};
use crate::normalize::normalize_payload;
use crate::types::{NormalizedRecord, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Resolved {
        #[serde(rename = "cnddtId")]
        cnddt_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        party_name: Option<String>,
        pledge_count: usize,
    },
    Failed {
        stage: ChainStage,
        message: String,
    },
    Errored {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProbe {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// Run the pledge chain for each name against the same election,
/// concurrently. Useful for checking which spellings actually resolve
/// before committing to a fan-out.
pub async fn probe_candidates(
    connector: &dyn ApiConnector,
    sg_id: &str,
    sg_typecode: &str,
    names: &[String],
) -> Vec<CandidateProbe> {
    let probes = names.iter().map(|name| async move {
        let resolver = ChainResolver::new(connector);
        let outcome = match resolver.resolve(sg_id, sg_typecode, name, None).await {
            Ok(ChainOutcome::Resolved {
                candidate, records, ..
            }) => ProbeOutcome::Resolved {
                cnddt_id: candidate.cnddt_id,
                party_name: candidate.party_name,
                pledge_count: records.len(),
            },
            Ok(ChainOutcome::Failed(failure)) => ProbeOutcome::Failed {
                stage: failure.stage,
                message: failure.message,
            },
            Err(err) => ProbeOutcome::Errored {
                message: err.to_string(),
            },
        };
        CandidateProbe {
            name: name.clone(),
            outcome,
        }
    });
    let results = join_all(probes).await;
    debug!(
        "probed {} candidates, {} resolved",
        results.len(),
        results
            .iter()
            .filter(|p| matches!(p.outcome, ProbeOutcome::Resolved { .. }))
            .count()
    );
    results
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPolicySummary {
    pub party_name: String,
    pub sg_id: String,
    pub success: bool,
    pub policy_count: usize,
    /// Distinct policy realms, in first-seen order.
    pub realms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Side-by-side policy summaries for several parties in one election,
/// fetched concurrently.
pub async fn compare_party_policies(
    connector: &dyn ApiConnector,
    sg_id: &str,
    parties: &[String],
) -> Vec<PartyPolicySummary> {
    let fetches = parties.iter().map(|party| async move {
        let request = ApiRequest::new(SourceId::PartyPolicy, SourceId::PartyPolicy.endpoint())
            .param("sgId", sg_id)
            .param("partyName", party);
        match connector.fetch(&request).await {
            Ok(response) if response.success => {
                let normalized = normalize_payload(SourceId::PartyPolicy, &response.data);
                if normalized.success {
                    summarize(party, sg_id, &normalized.data)
                } else {
                    failure_summary(party, sg_id, normalized.error)
                }
            }
            Ok(response) => failure_summary(party, sg_id, response.error),
            Err(err) => failure_summary(party, sg_id, Some(err.to_string())),
        }
    });
    join_all(fetches).await
}

fn summarize(party: &str, sg_id: &str, records: &[NormalizedRecord]) -> PartyPolicySummary {
    let mut policy_count = 0;
    let mut realms: Vec<String> = Vec::new();
    for record in records {
        if let NormalizedRecord::PartyPolicy(policy) = record {
            policy_count += policy.items.len();
            for item in &policy.items {
                if !item.realm.is_empty() && !realms.contains(&item.realm) {
                    realms.push(item.realm.clone());
                }
            }
        }
    }
    PartyPolicySummary {
        party_name: party.to_string(),
        sg_id: sg_id.to_string(),
        success: true,
        policy_count,
        realms,
        error: None,
    }
}

fn failure_summary(party: &str, sg_id: &str, error: Option<String>) -> PartyPolicySummary {
    PartyPolicySummary {
        party_name: party.to_string(),
        sg_id: sg_id.to_string(),
        success: false,
        policy_count: 0,
        realms: Vec::new(),
        error: error.or_else(|| Some("upstream reported an error".to_string())),
    }
}
