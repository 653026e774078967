//! Candidate-pledge adapter (후보자 선거공약).
//!
//! The upstream endpoint is keyed by `cnddtId`, which generic filters never
//! carry. Unless the caller passed one through `filters.custom`, the
//! adapter flags the params for the chain resolver, which turns a candidate
//! name into an id via the roster endpoint first.

use serde::Serialize;

use super::{
    apply_election_hint, elections_in_range, extract_candidate_names, infer_election,
    validate_common, InferenceContext, InferenceTrail, ParamValidation, SourceAdapter,
    DEFAULT_NUM_OF_ROWS, DEFAULT_PAGE_NO,
};
use crate::elections;
use crate::normalize::{pick_string, pick_u64, CANDIDATE_ID_ALIASES};
use crate::types::{QueryFilters, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeParams {
    pub sg_id: Option<String>,
    pub sg_typecode: Option<String>,
    /// Upstream candidate id; present only when the caller already knew it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnddt_id: Option<String>,
    /// Names for the chain resolver (one) or the fan-out path (several).
    pub candidate_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_hint: Option<String>,
    pub page_no: u32,
    pub num_of_rows: u32,
    #[serde(rename = "_needsCandidateLookup")]
    pub needs_candidate_lookup: bool,
    #[serde(rename = "_inferred", skip_serializing_if = "InferenceTrail::is_empty")]
    pub trail: InferenceTrail,
}

impl Default for PledgeParams {
    fn default() -> Self {
        Self {
            sg_id: None,
            sg_typecode: None,
            cnddt_id: None,
            candidate_names: Vec::new(),
            party_hint: None,
            page_no: DEFAULT_PAGE_NO,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            needs_candidate_lookup: true,
            trail: InferenceTrail::default(),
        }
    }
}

impl PledgeParams {
    /// Wire query for a resolved candidate, `cnddtId` included.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(v) = &self.sg_id {
            query.push(("sgId".to_string(), v.clone()));
        }
        if let Some(v) = &self.sg_typecode {
            query.push(("sgTypecode".to_string(), v.clone()));
        }
        if let Some(v) = &self.cnddt_id {
            query.push(("cnddtId".to_string(), v.clone()));
        }
        query.push(("pageNo".to_string(), self.page_no.to_string()));
        query.push(("numOfRows".to_string(), self.num_of_rows.to_string()));
        query
    }
}

pub struct PledgeAdapter;

impl SourceAdapter for PledgeAdapter {
    type Params = PledgeParams;

    fn id(&self) -> SourceId {
        SourceId::Pledge
    }

    fn adapt_filters(&self, filters: &QueryFilters) -> PledgeParams {
        let mut params = PledgeParams {
            sg_id: filters.sg_id.clone(),
            party_hint: filters.party_name.clone(),
            ..PledgeParams::default()
        };
        apply_election_hint(
            &mut params.sg_id,
            &mut params.sg_typecode,
            filters.election.as_ref(),
            &mut params.trail,
        );
        if params.sg_id.is_none() {
            if let Some(range) = &filters.date_range {
                if let Some(e) = elections_in_range(range).last() {
                    params.sg_id = Some(e.sg_id.to_string());
                    params.trail.note("sgId", format!("기간 필터 → {}", e.name));
                }
            }
        }
        params.cnddt_id = pick_string(&filters.custom, CANDIDATE_ID_ALIASES);
        params.needs_candidate_lookup = params.cnddt_id.is_none();
        if let Some(page) = pick_u64(&filters.custom, &["pageNo"]) {
            params.page_no = page as u32;
        }
        if let Some(rows) = pick_u64(&filters.custom, &["numOfRows"]) {
            params.num_of_rows = rows as u32;
        }
        params
    }

    fn infer_missing(&self, params: &mut PledgeParams, ctx: &InferenceContext<'_>) {
        if params.candidate_names.is_empty() && params.needs_candidate_lookup {
            let names = extract_candidate_names(ctx);
            if !names.is_empty() {
                params
                    .trail
                    .note("candidateNames", format!("질문에서 추출: {}", names.join(", ")));
                params.candidate_names = names;
            }
        }
        if params.party_hint.is_none() {
            if let Some(party) = elections::parties_in_text(ctx.query).first() {
                params.party_hint = Some(party.to_string());
                params.trail.note("partyHint", format!("질문에서 정당명 '{party}' 추출"));
            }
        }
        infer_election(
            &mut params.sg_id,
            &mut params.sg_typecode,
            ctx,
            &mut params.trail,
        );
    }

    fn validate(&self, params: &PledgeParams) -> ParamValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        validate_common(
            params.sg_id.as_deref(),
            params.sg_typecode.as_deref(),
            params.page_no,
            params.num_of_rows,
            &mut errors,
            &mut warnings,
        );
        if params.sg_typecode.is_none() {
            errors.push("sgTypecode is required".to_string());
        }
        if params.needs_candidate_lookup
            && params.cnddt_id.is_none()
            && params.candidate_names.is_empty()
        {
            errors.push(
                "specific candidate name required for pledge lookup (후보자명을 지정해 주세요)"
                    .to_string(),
            );
        }
        ParamValidation::from_parts(errors, warnings)
    }
}
