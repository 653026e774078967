//! Winner adapter (당선인), including the vote-share sub-mode.
//!
//! "득표율"/"투표율" questions still hit the winner endpoint; the sub-mode
//! only changes which extra names are pulled from the text and how the
//! normalized rows are filtered afterwards.

use serde::Serialize;

use super::{
    apply_election_hint, elections_in_range, extract_candidate_names, infer_election,
    validate_common, InferenceContext, InferenceTrail, ParamValidation, SourceAdapter,
    DEFAULT_NUM_OF_ROWS, DEFAULT_PAGE_NO,
};
use crate::elections;
use crate::interpreter::gazetteer;
use crate::normalize::{pick_string, pick_u64};
use crate::types::{NormalizedRecord, QueryFilters, SourceId};

/// Query sub-mode, serialized as the `_queryType` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_queryType", rename_all = "snake_case")]
pub enum WinnerMode {
    /// Plain winner roster.
    Roster,
    /// Vote-share question; names are post-filters on the same payload.
    VoteShare {
        #[serde(skip_serializing_if = "Option::is_none")]
        candidate: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        party: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerParams {
    pub sg_id: Option<String>,
    pub sg_typecode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd_name: Option<String>,
    pub page_no: u32,
    pub num_of_rows: u32,
    #[serde(flatten)]
    pub mode: WinnerMode,
    #[serde(rename = "_inferred", skip_serializing_if = "InferenceTrail::is_empty")]
    pub trail: InferenceTrail,
}

impl Default for WinnerParams {
    fn default() -> Self {
        Self {
            sg_id: None,
            sg_typecode: None,
            sd_name: None,
            page_no: DEFAULT_PAGE_NO,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            mode: WinnerMode::Roster,
            trail: InferenceTrail::default(),
        }
    }
}

impl WinnerParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(v) = &self.sg_id {
            query.push(("sgId".to_string(), v.clone()));
        }
        if let Some(v) = &self.sg_typecode {
            query.push(("sgTypecode".to_string(), v.clone()));
        }
        if let Some(v) = &self.sd_name {
            query.push(("sdName".to_string(), v.clone()));
        }
        query.push(("pageNo".to_string(), self.page_no.to_string()));
        query.push(("numOfRows".to_string(), self.num_of_rows.to_string()));
        query
    }

    /// Apply the vote-share name/party filters to normalized rows. The
    /// roster mode passes everything through.
    pub fn apply_mode_filter(&self, records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        let WinnerMode::VoteShare { candidate, party } = &self.mode else {
            return records;
        };
        if candidate.is_none() && party.is_none() {
            return records;
        }
        records
            .into_iter()
            .filter(|record| {
                let NormalizedRecord::Winner(w) = record else {
                    return true;
                };
                let candidate_ok = candidate
                    .as_deref()
                    .map_or(true, |name| w.name.contains(name));
                let party_ok = party
                    .as_deref()
                    .map_or(true, |p| w.party_name.contains(p));
                candidate_ok && party_ok
            })
            .collect()
    }
}

pub struct WinnerAdapter;

impl SourceAdapter for WinnerAdapter {
    type Params = WinnerParams;

    fn id(&self) -> SourceId {
        SourceId::Winner
    }

    fn adapt_filters(&self, filters: &QueryFilters) -> WinnerParams {
        let mut params = WinnerParams {
            sg_id: filters.sg_id.clone(),
            ..WinnerParams::default()
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
        if let Some(region) = &filters.region {
            params.sd_name = Some(gazetteer::canonical_sido(&region.sido));
        }
        if let Some(v) = pick_string(&filters.custom, &["sdName"]) {
            params.sd_name = Some(v);
        }
        if let Some(party) = &filters.party_name {
            params.mode = WinnerMode::VoteShare {
                candidate: None,
                party: Some(party.clone()),
            };
        }
        if let Some(page) = pick_u64(&filters.custom, &["pageNo"]) {
            params.page_no = page as u32;
        }
        if let Some(rows) = pick_u64(&filters.custom, &["numOfRows"]) {
            params.num_of_rows = rows as u32;
        }
        params
    }

    fn infer_missing(&self, params: &mut WinnerParams, ctx: &InferenceContext<'_>) {
        infer_election(
            &mut params.sg_id,
            &mut params.sg_typecode,
            ctx,
            &mut params.trail,
        );
        let wants_share = ctx.query.contains("득표율") || ctx.query.contains("투표율");
        if wants_share {
            let candidate = extract_candidate_names(ctx).into_iter().next();
            let party = match &params.mode {
                WinnerMode::VoteShare { party: Some(p), .. } => Some(p.clone()),
                _ => elections::parties_in_text(ctx.query)
                    .first()
                    .map(|p| p.to_string()),
            };
            params.trail.note(
                "_queryType",
                format!(
                    "득표율/투표율 키워드 → vote_share (후보: {}, 정당: {})",
                    candidate.as_deref().unwrap_or("-"),
                    party.as_deref().unwrap_or("-")
                ),
            );
            params.mode = WinnerMode::VoteShare { candidate, party };
        }
    }

    fn validate(&self, params: &WinnerParams) -> ParamValidation {
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
        if let WinnerMode::VoteShare {
            candidate: None,
            party: None,
        } = &params.mode
        {
            warnings.push(
                "vote-share query without candidate or party filter, returning all winners"
                    .to_string(),
            );
        }
        ParamValidation::from_parts(errors, warnings)
    }
}
