//! Candidate-roster adapter (후보자 명부).

use serde::Serialize;

use super::{
    apply_election_hint, elections_in_range, extract_candidate_names, infer_election,
    validate_common, InferenceContext, InferenceTrail, ParamValidation, SourceAdapter,
    DEFAULT_NUM_OF_ROWS, DEFAULT_PAGE_NO,
};
use crate::interpreter::gazetteer;
use crate::normalize::{pick_string, pick_u64};
use crate::types::{QueryFilters, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateParams {
    pub sg_id: Option<String>,
    pub sg_typecode: Option<String>,
    /// 시·도 name, full form ("서울특별시").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd_name: Option<String>,
    /// Electoral district name; fixed to 대한민국 for presidential races.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sgg_name: Option<String>,
    /// Client-side substring filter on the candidate name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_filter: Option<String>,
    pub page_no: u32,
    pub num_of_rows: u32,
    #[serde(rename = "_inferred", skip_serializing_if = "InferenceTrail::is_empty")]
    pub trail: InferenceTrail,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            sg_id: None,
            sg_typecode: None,
            sd_name: None,
            sgg_name: None,
            name_filter: None,
            page_no: DEFAULT_PAGE_NO,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            trail: InferenceTrail::default(),
        }
    }
}

impl CandidateParams {
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
        if let Some(v) = &self.sgg_name {
            query.push(("sggName".to_string(), v.clone()));
        }
        query.push(("pageNo".to_string(), self.page_no.to_string()));
        query.push(("numOfRows".to_string(), self.num_of_rows.to_string()));
        query
    }
}

pub struct CandidateAdapter;

impl SourceAdapter for CandidateAdapter {
    type Params = CandidateParams;

    fn id(&self) -> SourceId {
        SourceId::Candidate
    }

    fn adapt_filters(&self, filters: &QueryFilters) -> CandidateParams {
        let mut params = CandidateParams {
            sg_id: filters.sg_id.clone(),
            ..CandidateParams::default()
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
            params.sgg_name = region.sigungu.clone();
        }
        if let Some(v) = pick_string(&filters.custom, &["sdName"]) {
            params.sd_name = Some(v);
        }
        if let Some(v) = pick_string(&filters.custom, &["sggName"]) {
            params.sgg_name = Some(v);
        }
        if let Some(page) = pick_u64(&filters.custom, &["pageNo"]) {
            params.page_no = page as u32;
        }
        if let Some(rows) = pick_u64(&filters.custom, &["numOfRows"]) {
            params.num_of_rows = rows as u32;
        }
        params
    }

    fn infer_missing(&self, params: &mut CandidateParams, ctx: &InferenceContext<'_>) {
        infer_election(
            &mut params.sg_id,
            &mut params.sg_typecode,
            ctx,
            &mut params.trail,
        );
        if params.name_filter.is_none() {
            if let Some(name) = extract_candidate_names(ctx).into_iter().next() {
                params.trail.note("nameFilter", format!("후보자명 '{name}' 응답 필터"));
                params.name_filter = Some(name);
            }
        }
        // The presidential race is one nationwide district.
        if params.sg_typecode.as_deref() == Some("1") && params.sgg_name.is_none() {
            params.sgg_name = Some("대한민국".to_string());
            params.trail.note("sggName", "대통령선거는 전국 단일 선거구");
        }
    }

    fn validate(&self, params: &CandidateParams) -> ParamValidation {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParsedQuery, Region};

    fn adapt(query: &str, keywords: &[&str]) -> CandidateParams {
        let mut parsed = ParsedQuery::fetch(query, SourceId::Candidate);
        parsed.filters.keywords = keywords.iter().map(|s| s.to_string()).collect();
        let adapter = CandidateAdapter;
        let mut params = adapter.adapt_filters(&parsed.filters);
        adapter.infer_missing(&mut params, &InferenceContext::of(&parsed));
        params
    }

    #[test]
    fn presidential_roster_pins_nationwide_district() {
        let params = adapt("2022년 대선 후보 명단", &["대선", "후보", "명단"]);
        assert_eq!(params.sg_id.as_deref(), Some("20220309"));
        assert_eq!(params.sg_typecode.as_deref(), Some("1"));
        assert_eq!(params.sgg_name.as_deref(), Some("대한민국"));
        assert!(CandidateAdapter.validate(&params).valid);
    }

    #[test]
    fn region_maps_to_full_sido_name() {
        let mut parsed = ParsedQuery::fetch("서울 시장 후보", SourceId::Candidate);
        parsed.filters.region = Some(Region {
            sido: "서울".to_string(),
            sigungu: None,
        });
        let adapter = CandidateAdapter;
        let mut params = adapter.adapt_filters(&parsed.filters);
        adapter.infer_missing(&mut params, &InferenceContext::of(&parsed));
        assert_eq!(params.sd_name.as_deref(), Some("서울특별시"));
        assert_eq!(params.sg_id.as_deref(), Some("20220601"));
        assert_eq!(params.sg_typecode.as_deref(), Some("3"));
    }

    #[test]
    fn wire_query_has_upstream_names() {
        let params = adapt("2024년 총선 후보", &["총선", "후보"]);
        let query = params.to_query();
        let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["sgId", "sgTypecode", "pageNo", "numOfRows"]);
    }
}
