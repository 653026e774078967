//! Election-statistics adapter (투표율·선거인수).

use serde::Serialize;

use super::{
    apply_election_hint, elections_in_range, infer_election, validate_common, InferenceContext,
    InferenceTrail, ParamValidation, SourceAdapter, DEFAULT_NUM_OF_ROWS, DEFAULT_PAGE_NO,
};
use crate::interpreter::gazetteer;
use crate::normalize::{pick_string, pick_u64};
use crate::types::{QueryFilters, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
    pub sg_id: Option<String>,
    pub sg_typecode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd_name: Option<String>,
    pub page_no: u32,
    pub num_of_rows: u32,
    #[serde(rename = "_inferred", skip_serializing_if = "InferenceTrail::is_empty")]
    pub trail: InferenceTrail,
}

impl Default for StatsParams {
    fn default() -> Self {
        Self {
            sg_id: None,
            sg_typecode: None,
            sd_name: None,
            page_no: DEFAULT_PAGE_NO,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            trail: InferenceTrail::default(),
        }
    }
}

impl StatsParams {
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
}

pub struct StatsAdapter;

impl SourceAdapter for StatsAdapter {
    type Params = StatsParams;

    fn id(&self) -> SourceId {
        SourceId::Stats
    }

    fn adapt_filters(&self, filters: &QueryFilters) -> StatsParams {
        let mut params = StatsParams {
            sg_id: filters.sg_id.clone(),
            ..StatsParams::default()
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
        if let Some(page) = pick_u64(&filters.custom, &["pageNo"]) {
            params.page_no = page as u32;
        }
        if let Some(rows) = pick_u64(&filters.custom, &["numOfRows"]) {
            params.num_of_rows = rows as u32;
        }
        params
    }

    fn infer_missing(&self, params: &mut StatsParams, ctx: &InferenceContext<'_>) {
        infer_election(
            &mut params.sg_id,
            &mut params.sg_typecode,
            ctx,
            &mut params.trail,
        );
    }

    fn validate(&self, params: &StatsParams) -> ParamValidation {
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
        ParamValidation::from_parts(errors, warnings)
    }
}
