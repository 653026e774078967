//! Party-policy adapter (정당 정책공약).
//!
//! Two resolution rules set this adapter apart: an unresolved party name is
//! not an error but a request to query all major parties, and a date range
//! spanning several known elections produces one election id per election,
//! which the fan-out aggregator turns into a combination list.

use itertools::Itertools;
use serde::Serialize;

use super::{
    elections_in_range, infer_election, InferenceContext, InferenceTrail, ParamValidation,
    SourceAdapter, DEFAULT_NUM_OF_ROWS, DEFAULT_PAGE_NO,
};
use crate::elections::{self, ElectionType};
use crate::normalize::pick_u64;
use crate::types::{QueryFilters, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPolicyParams {
    /// One or more election ids; several mean a fan-out per election.
    pub sg_ids: Vec<String>,
    pub party_names: Vec<String>,
    pub page_no: u32,
    pub num_of_rows: u32,
    #[serde(rename = "_queryAllMajorParties")]
    pub query_all_major_parties: bool,
    #[serde(rename = "_inferred", skip_serializing_if = "InferenceTrail::is_empty")]
    pub trail: InferenceTrail,
}

impl Default for PartyPolicyParams {
    fn default() -> Self {
        Self {
            sg_ids: Vec::new(),
            party_names: Vec::new(),
            page_no: DEFAULT_PAGE_NO,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            query_all_major_parties: false,
            trail: InferenceTrail::default(),
        }
    }
}

impl PartyPolicyParams {
    /// Upstream combination list: every party crossed with every election,
    /// duplicates collapsed. Parties are the logical keys the aggregator
    /// scores.
    pub fn combinations(&self) -> Vec<(String, String)> {
        self.party_names
            .iter()
            .cartesian_product(&self.sg_ids)
            .map(|(party, sg_id)| (party.clone(), sg_id.clone()))
            .unique()
            .collect()
    }

    /// Wire query for one `(party, election)` combination.
    pub fn query_for(&self, party: &str, sg_id: &str) -> Vec<(String, String)> {
        vec![
            ("sgId".to_string(), sg_id.to_string()),
            ("partyName".to_string(), party.to_string()),
            ("pageNo".to_string(), self.page_no.to_string()),
            ("numOfRows".to_string(), self.num_of_rows.to_string()),
        ]
    }
}

pub struct PartyPolicyAdapter;

impl SourceAdapter for PartyPolicyAdapter {
    type Params = PartyPolicyParams;

    fn id(&self) -> SourceId {
        SourceId::PartyPolicy
    }

    fn adapt_filters(&self, filters: &QueryFilters) -> PartyPolicyParams {
        let mut params = PartyPolicyParams::default();
        if let Some(sg_id) = &filters.sg_id {
            params.sg_ids.push(sg_id.clone());
        }
        if params.sg_ids.is_empty() {
            if let Some(hint) = &filters.election {
                if let Some(year) = hint.year {
                    let t = hint
                        .sg_typecode
                        .as_deref()
                        .and_then(ElectionType::from_code)
                        .or_else(|| {
                            hint.kind.as_deref().and_then(ElectionType::from_keyword)
                        });
                    let found = match t {
                        Some(t) => elections::by_year_and_type(year, t),
                        None => elections::by_year(year),
                    };
                    if let Some(e) = found {
                        params.sg_ids.push(e.sg_id.to_string());
                        params
                            .trail
                            .note("sgId", format!("선거 힌트 {year}년 → {}", e.name));
                    }
                }
            }
        }
        if params.sg_ids.is_empty() {
            if let Some(range) = &filters.date_range {
                let spanned = elections_in_range(range);
                if !spanned.is_empty() {
                    params.sg_ids = spanned.iter().map(|e| e.sg_id.to_string()).collect();
                    params.trail.note(
                        "sgId",
                        format!("기간 필터에 걸친 선거 {}건", spanned.len()),
                    );
                }
            }
        }
        if let Some(party) = &filters.party_name {
            params.party_names.push(party.clone());
        }
        if let Some(page) = pick_u64(&filters.custom, &["pageNo"]) {
            params.page_no = page as u32;
        }
        if let Some(rows) = pick_u64(&filters.custom, &["numOfRows"]) {
            params.num_of_rows = rows as u32;
        }
        params
    }

    fn infer_missing(&self, params: &mut PartyPolicyParams, ctx: &InferenceContext<'_>) {
        if params.party_names.is_empty() {
            let found = elections::parties_in_text(ctx.query);
            if !found.is_empty() {
                params
                    .trail
                    .note("partyName", format!("질문에서 추출: {}", found.join(", ")));
                params.party_names = found.iter().map(|p| p.to_string()).collect();
            }
        }
        if params.party_names.is_empty() {
            params.query_all_major_parties = true;
            params.party_names = elections::MAJOR_PARTIES
                .iter()
                .map(|p| p.to_string())
                .collect();
            params
                .trail
                .note("partyName", "정당 미지정, 주요 정당 전체 조회");
        }
        if params.sg_ids.is_empty() {
            let mut sg_id = None;
            let mut typecode = None;
            infer_election(&mut sg_id, &mut typecode, ctx, &mut params.trail);
            if let Some(sg_id) = sg_id {
                params.sg_ids.push(sg_id);
            }
        }
    }

    fn validate(&self, params: &PartyPolicyParams) -> ParamValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        if params.sg_ids.is_empty() {
            errors.push("sgId is required".to_string());
        }
        for sg_id in &params.sg_ids {
            if sg_id.len() != 8 || !sg_id.bytes().all(|b| b.is_ascii_digit()) {
                errors.push(format!("sgId '{sg_id}' must be an 8-digit YYYYMMDD election id"));
            } else if elections::by_sg_id(sg_id).is_none() {
                warnings.push(format!("unknown election id '{sg_id}', passing through"));
            }
        }
        if params.party_names.is_empty() && !params.query_all_major_parties {
            errors.push("party name required unless querying all major parties".to_string());
        }
        if params.page_no < 1 {
            errors.push("pageNo must be at least 1".to_string());
        }
        if !(1..=100).contains(&params.num_of_rows) {
            errors.push(format!(
                "numOfRows {} out of bounds (1..=100)",
                params.num_of_rows
            ));
        }
        ParamValidation::from_parts(errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateRange, ParsedQuery};
    use chrono::NaiveDate;

    fn adapt(query: &str) -> PartyPolicyParams {
        let parsed = ParsedQuery::fetch(query, SourceId::PartyPolicy);
        let adapter = PartyPolicyAdapter;
        let mut params = adapter.adapt_filters(&parsed.filters);
        adapter.infer_missing(&mut params, &InferenceContext::of(&parsed));
        params
    }

    #[test]
    fn named_party_is_used_directly() {
        let params = adapt("국민의힘 정책 알려줘");
        assert_eq!(params.party_names, vec!["국민의힘".to_string()]);
        assert!(!params.query_all_major_parties);
        assert_eq!(params.sg_ids, vec![elections::DEFAULT_SG_ID.to_string()]);
        assert!(PartyPolicyAdapter.validate(&params).valid);
    }

    #[test]
    fn missing_party_queries_all_major_parties() {
        let params = adapt("정당 정책 알려줘");
        assert!(params.query_all_major_parties);
        assert_eq!(params.party_names.len(), elections::MAJOR_PARTIES.len());
        assert!(PartyPolicyAdapter.validate(&params).valid);
    }

    #[test]
    fn date_range_spanning_elections_fans_out() {
        let mut parsed = ParsedQuery::fetch("정당 공약 비교", SourceId::PartyPolicy);
        parsed.filters.date_range = Some(DateRange {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        });
        let adapter = PartyPolicyAdapter;
        let mut params = adapter.adapt_filters(&parsed.filters);
        adapter.infer_missing(&mut params, &InferenceContext::of(&parsed));
        assert_eq!(
            params.sg_ids,
            vec![
                "20200415".to_string(),
                "20220309".to_string(),
                "20220601".to_string()
            ]
        );
        // 3 elections × 3 major parties
        assert_eq!(params.combinations().len(), 9);
    }

    #[test]
    fn combination_query_is_per_party_and_election() {
        let params = adapt("더불어민주당 정책");
        let combos = params.combinations();
        assert_eq!(combos.len(), 1);
        let query = params.query_for(&combos[0].0, &combos[0].1);
        assert!(query.contains(&("partyName".to_string(), "더불어민주당".to_string())));
        assert!(query.iter().any(|(k, _)| k == "sgId"));
    }

    #[test]
    fn two_named_parties_both_kept() {
        let params = adapt("더불어민주당과 국민의힘 정책 비교");
        assert_eq!(params.party_names.len(), 2);
        assert!(!params.query_all_major_parties);
    }
}
