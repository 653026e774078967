//! Multi-key aggregation over sequential upstream calls.
//!
//! Party-policy queries fan out over (party × election) combinations and
//! multi-candidate pledge queries over candidate names. Calls run one at a
//! time because the upstream gateway rate-limits aggressively. A logical key
//! (party or candidate) counts as failed only when no combination carrying
//! it succeeded; one success anywhere wins.

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, warn};

use crate::adapters::PartyPolicyParams;
use crate::chain::{ChainOutcome, ChainResolver};
use crate::connector::{ApiConnector, ApiRequest};
use crate::normalize::normalize_payload;
use crate::types::{NormalizedRecord, SourceId};

/// Success/failure bookkeeping for logical keys. Pure so the tie-break
/// arithmetic stays testable without a connector.
#[derive(Debug, Default)]
pub struct FanoutLedger {
    succeeded: IndexSet<String>,
    failed: IndexSet<String>,
}

impl FanoutLedger {
    pub fn mark_success(&mut self, key: &str) {
        self.succeeded.insert(key.to_string());
    }

    pub fn mark_failure(&mut self, key: &str) {
        self.failed.insert(key.to_string());
    }

    pub fn any_success(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn success_keys(&self) -> Vec<String> {
        self.succeeded.iter().cloned().collect()
    }

    /// Keys that failed in every combination they appeared in.
    pub fn failed_keys(&self) -> Vec<String> {
        self.failed
            .iter()
            .filter(|key| !self.succeeded.contains(*key))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutReport {
    pub success: bool,
    pub items: Vec<NormalizedRecord>,
    pub success_keys: Vec<String>,
    pub failed_keys: Vec<String>,
    pub combinations_attempted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FanoutReport {
    fn from_ledger(
        ledger: FanoutLedger,
        items: Vec<NormalizedRecord>,
        attempted: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            success: !attempted.is_empty() && ledger.any_success(),
            items,
            success_keys: ledger.success_keys(),
            failed_keys: ledger.failed_keys(),
            combinations_attempted: attempted,
            errors,
        }
    }

    fn empty() -> Self {
        Self {
            success: false,
            items: Vec::new(),
            success_keys: Vec::new(),
            failed_keys: Vec::new(),
            combinations_attempted: Vec::new(),
            errors: vec!["조회할 조합이 없습니다".to_string()],
        }
    }
}

pub struct FanoutAggregator<'a> {
    connector: &'a dyn ApiConnector,
}

impl<'a> FanoutAggregator<'a> {
    pub fn new(connector: &'a dyn ApiConnector) -> Self {
        Self { connector }
    }

    /// One call per (party × election) combination, keyed by party.
    /// Transport faults mark the combination failed instead of aborting the
    /// remaining ones.
    pub async fn party_policies(&self, params: &PartyPolicyParams) -> FanoutReport {
        let combinations = params.combinations();
        if combinations.is_empty() {
            return FanoutReport::empty();
        }
        let attempted: Vec<String> = combinations
            .iter()
            .map(|(party, sg_id)| format!("{party} × {sg_id}"))
            .collect();

        let mut ledger = FanoutLedger::default();
        let mut items = Vec::new();
        let mut errors = Vec::new();
        for (party, sg_id) in &combinations {
            let mut request =
                ApiRequest::new(SourceId::PartyPolicy, SourceId::PartyPolicy.endpoint());
            for (key, value) in params.query_for(party, sg_id) {
                request = request.param(&key, value);
            }
            match self.fetch_normalized(SourceId::PartyPolicy, &request).await {
                Ok(mut records) => {
                    debug!("{party} × {sg_id}: {} policy records", records.len());
                    for record in &mut records {
                        record.tag_election(sg_id);
                    }
                    items.extend(records);
                    ledger.mark_success(party);
                }
                Err(message) => {
                    warn!("{party} × {sg_id} failed: {message}");
                    errors.push(format!("{party} × {sg_id}: {message}"));
                    ledger.mark_failure(party);
                }
            }
        }
        FanoutReport::from_ledger(ledger, items, attempted, errors)
    }

    /// One chain resolution per candidate name within a fixed election.
    pub async fn pledges(
        &self,
        sg_id: &str,
        sg_typecode: &str,
        names: &[String],
        party_hint: Option<&str>,
    ) -> FanoutReport {
        if names.is_empty() {
            return FanoutReport::empty();
        }
        let attempted: Vec<String> = names
            .iter()
            .map(|name| format!("{name} × {sg_id}"))
            .collect();

        let resolver = ChainResolver::new(self.connector);
        let mut ledger = FanoutLedger::default();
        let mut items = Vec::new();
        let mut errors = Vec::new();
        for name in names {
            match resolver.resolve(sg_id, sg_typecode, name, party_hint).await {
                Ok(ChainOutcome::Resolved { mut records, .. }) => {
                    for record in &mut records {
                        record.tag_election(sg_id);
                    }
                    items.extend(records);
                    ledger.mark_success(name);
                }
                Ok(ChainOutcome::Failed(failure)) => {
                    warn!("pledge chain for '{name}' failed: {}", failure.message);
                    errors.push(format!("{name}: {}", failure.message));
                    ledger.mark_failure(name);
                }
                Err(err) => {
                    warn!("pledge chain for '{name}' errored: {err}");
                    errors.push(format!("{name}: {err}"));
                    ledger.mark_failure(name);
                }
            }
        }
        FanoutReport::from_ledger(ledger, items, attempted, errors)
    }

    async fn fetch_normalized(
        &self,
        source: SourceId,
        request: &ApiRequest,
    ) -> Result<Vec<NormalizedRecord>, String> {
        match self.connector.fetch(request).await {
            Ok(response) if response.success => {
                let normalized = normalize_payload(source, &response.data);
                if normalized.success {
                    Ok(normalized.data)
                } else {
                    Err(normalized
                        .error
                        .unwrap_or_else(|| "upstream reported an error".to_string()))
                }
            }
            Ok(response) => Err(response
                .error
                .unwrap_or_else(|| "upstream reported an error".to_string())),
            Err(err) => Err(err.to_string()),
        }
    }
}
