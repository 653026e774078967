//! Source adapters: generic query filters → upstream parameter shapes.
//!
//! Each source family implements the same four pure operations
//! (`adapt_filters`, `infer_missing`, `validate`, `normalize`). The results
//! are carried in [`AdaptedParams`], a discriminated union keyed by source,
//! so a parameter name typo in one adapter cannot silently leak into
//! another. Every inferred field is recorded in an [`InferenceTrail`] that
//! travels with the params into debug metadata.

pub mod candidate;
pub mod party_policy;
pub mod pledge;
pub mod stats;
pub mod winner;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::elections::{self, Election, ElectionType};
use crate::types::{
    DateRange, ElectionHint, NormalizedResponse, ParsedQuery, QueryFilters, SourceId,
};

pub use candidate::{CandidateAdapter, CandidateParams};
pub use party_policy::{PartyPolicyAdapter, PartyPolicyParams};
pub use pledge::{PledgeAdapter, PledgeParams};
pub use stats::{StatsAdapter, StatsParams};
pub use winner::{WinnerAdapter, WinnerMode, WinnerParams};

/// Insertion-ordered audit trail: field → human-readable reason it was
/// filled in. Serialized as `_inferred` in debug payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InferenceTrail(IndexMap<String, String>);

impl InferenceTrail {
    pub fn note(&mut self, field: &str, reason: impl Into<String>) {
        self.0.insert(field.to_string(), reason.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What `infer_missing` may consult beyond the params themselves.
#[derive(Debug, Clone, Copy)]
pub struct InferenceContext<'a> {
    pub query: &'a str,
    pub keywords: &'a [String],
}

impl<'a> InferenceContext<'a> {
    pub fn of(parsed: &'a ParsedQuery) -> Self {
        Self {
            query: &parsed.raw_query,
            keywords: &parsed.filters.keywords,
        }
    }
}

/// Validation outcome as data. Invalid params are reported, never thrown,
/// so callers can render exactly what is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParamValidation {
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn ok() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }
}

/// The four per-source operations. `normalize` shares one implementation
/// because every upstream speaks the same envelope dialect.
pub trait SourceAdapter {
    type Params;

    fn id(&self) -> SourceId;

    fn adapt_filters(&self, filters: &QueryFilters) -> Self::Params;

    fn infer_missing(&self, params: &mut Self::Params, ctx: &InferenceContext<'_>);

    fn validate(&self, params: &Self::Params) -> ParamValidation;

    fn normalize(&self, raw: &Value) -> NormalizedResponse {
        crate::normalize::normalize_payload(self.id(), raw)
    }
}

/// Per-source parameter shapes, tagged by source id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source")]
pub enum AdaptedParams {
    #[serde(rename = "public_data_pledge")]
    Pledge(PledgeParams),
    #[serde(rename = "public_data_party_policy")]
    PartyPolicy(PartyPolicyParams),
    #[serde(rename = "public_data_candidate")]
    Candidate(CandidateParams),
    #[serde(rename = "public_data_winner")]
    Winner(WinnerParams),
    #[serde(rename = "public_data_stats")]
    Stats(StatsParams),
}

impl AdaptedParams {
    pub fn source_id(&self) -> SourceId {
        match self {
            Self::Pledge(_) => SourceId::Pledge,
            Self::PartyPolicy(_) => SourceId::PartyPolicy,
            Self::Candidate(_) => SourceId::Candidate,
            Self::Winner(_) => SourceId::Winner,
            Self::Stats(_) => SourceId::Stats,
        }
    }

    pub fn trail(&self) -> &InferenceTrail {
        match self {
            Self::Pledge(p) => &p.trail,
            Self::PartyPolicy(p) => &p.trail,
            Self::Candidate(p) => &p.trail,
            Self::Winner(p) => &p.trail,
            Self::Stats(p) => &p.trail,
        }
    }
}

/// Run `adapt_filters` then `infer_missing` for the query's source.
pub fn adapt(source: SourceId, parsed: &ParsedQuery) -> AdaptedParams {
    let ctx = InferenceContext::of(parsed);
    match source {
        SourceId::Pledge => {
            let adapter = PledgeAdapter;
            let mut params = adapter.adapt_filters(&parsed.filters);
            adapter.infer_missing(&mut params, &ctx);
            AdaptedParams::Pledge(params)
        }
        SourceId::PartyPolicy => {
            let adapter = PartyPolicyAdapter;
            let mut params = adapter.adapt_filters(&parsed.filters);
            adapter.infer_missing(&mut params, &ctx);
            AdaptedParams::PartyPolicy(params)
        }
        SourceId::Candidate => {
            let adapter = CandidateAdapter;
            let mut params = adapter.adapt_filters(&parsed.filters);
            adapter.infer_missing(&mut params, &ctx);
            AdaptedParams::Candidate(params)
        }
        SourceId::Winner => {
            let adapter = WinnerAdapter;
            let mut params = adapter.adapt_filters(&parsed.filters);
            adapter.infer_missing(&mut params, &ctx);
            AdaptedParams::Winner(params)
        }
        SourceId::Stats => {
            let adapter = StatsAdapter;
            let mut params = adapter.adapt_filters(&parsed.filters);
            adapter.infer_missing(&mut params, &ctx);
            AdaptedParams::Stats(params)
        }
    }
}

/// Validate already-adapted params.
pub fn validate(params: &AdaptedParams) -> ParamValidation {
    match params {
        AdaptedParams::Pledge(p) => PledgeAdapter.validate(p),
        AdaptedParams::PartyPolicy(p) => PartyPolicyAdapter.validate(p),
        AdaptedParams::Candidate(p) => CandidateAdapter.validate(p),
        AdaptedParams::Winner(p) => WinnerAdapter.validate(p),
        AdaptedParams::Stats(p) => StatsAdapter.validate(p),
    }
}

pub const DEFAULT_PAGE_NO: u32 = 1;
pub const DEFAULT_NUM_OF_ROWS: u32 = 100;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d\d").unwrap());

pub(crate) fn year_in_text(text: &str) -> Option<i32> {
    YEAR_RE.find(text)?.as_str().parse().ok()
}

/// Standard election-inference ladder shared by the adapters:
/// known figure → year(+type) → type keyword / "최근" → hard default.
/// Fills `sg_id`/`sg_typecode` only when missing, noting every step.
pub(crate) fn infer_election(
    sg_id: &mut Option<String>,
    sg_typecode: &mut Option<String>,
    ctx: &InferenceContext<'_>,
    trail: &mut InferenceTrail,
) {
    let type_hint = sg_typecode
        .as_deref()
        .and_then(ElectionType::from_code)
        .or_else(|| ElectionType::from_keyword(ctx.query));

    if sg_id.is_none() {
        if let Some((name, id)) = elections::figure_in_text(ctx.query) {
            *sg_id = Some(id.to_string());
            let label = elections::by_sg_id(id).map(|e| e.name).unwrap_or(id);
            trail.note("sgId", format!("후보자 '{name}' → {label}"));
        } else if let Some(year) = year_in_text(ctx.query) {
            let found = match type_hint {
                Some(t) => elections::by_year_and_type(year, t),
                None => elections::by_year(year),
            };
            if let Some(e) = found {
                *sg_id = Some(e.sg_id.to_string());
                trail.note("sgId", format!("{year}년 키워드 → {}", e.name));
            }
        }
    }
    if sg_id.is_none() {
        if let Some(t) = type_hint {
            if let Some(e) = elections::latest_of_type(t) {
                *sg_id = Some(e.sg_id.to_string());
                let via = if ctx.query.contains("최근") {
                    "'최근' + 선거 종류"
                } else {
                    "선거 종류 키워드"
                };
                trail.note("sgId", format!("{via} → {}", e.name));
            }
        } else if ctx.query.contains("최근") {
            let e = elections::latest();
            *sg_id = Some(e.sg_id.to_string());
            trail.note("sgId", format!("'최근' → {}", e.name));
        }
    }
    if sg_id.is_none() {
        let e = elections::latest();
        *sg_id = Some(e.sg_id.to_string());
        trail.note("sgId", format!("기본값 → {}", e.name));
    }

    if sg_typecode.is_none() {
        let election = sg_id.as_deref().and_then(elections::by_sg_id);
        let resolved = match (type_hint, election) {
            (Some(t), Some(e)) if e.holds(t) => Some(t),
            (_, Some(e)) => Some(e.primary_type()),
            (Some(t), None) => Some(t),
            (None, None) => None,
        };
        if let Some(t) = resolved {
            *sg_typecode = Some(t.code().to_string());
            trail.note("sgTypecode", format!("선거 {} 기준", sg_id.as_deref().unwrap_or("?")));
        }
    }
}

/// Shared bounds/consistency checks for `(sgId, sgTypecode, pageNo, numOfRows)`.
pub(crate) fn validate_common(
    sg_id: Option<&str>,
    sg_typecode: Option<&str>,
    page_no: u32,
    num_of_rows: u32,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    match sg_id {
        None => errors.push("sgId is required".to_string()),
        Some(id) if id.len() != 8 || !id.bytes().all(|b| b.is_ascii_digit()) => {
            errors.push(format!("sgId '{id}' must be an 8-digit YYYYMMDD election id"));
        }
        Some(id) => {
            match elections::by_sg_id(id) {
                None => warnings.push(format!("unknown election id '{id}', passing through")),
                Some(e) => {
                    if let Some(code) = sg_typecode {
                        let holds = ElectionType::from_code(code)
                            .map(|t| e.holds(t))
                            .unwrap_or(false);
                        if !holds {
                            errors.push(format!(
                                "sgTypecode '{code}' does not match election {id} ({})",
                                e.name
                            ));
                        }
                    }
                }
            }
        }
    }
    if let Some(code) = sg_typecode {
        if ElectionType::from_code(code).is_none() {
            errors.push(format!(
                "sgTypecode '{code}' is not one of the documented codes (1,2,3,4,5,6,8)"
            ));
        }
    }
    if page_no < 1 {
        errors.push("pageNo must be at least 1".to_string());
    }
    if !(1..=100).contains(&num_of_rows) {
        errors.push(format!("numOfRows {num_of_rows} out of bounds (1..=100)"));
    }
}

/// Shape check for candidate-name tokens: 2–4 Hangul syllables that are
/// not a domain word or a party name.
pub(crate) fn name_like(token: &str) -> bool {
    const DOMAIN_WORDS: &[&str] = &[
        "공약", "정책", "후보", "후보자", "당선", "당선인", "당선자", "선거", "대통령", "대선",
        "총선", "지방", "시장", "지사", "도지사", "교육감", "의원", "국회", "득표", "득표율",
        "투표", "투표율", "통계", "선거인", "정당", "명단", "목록", "결과", "최근", "이번",
    ];
    let len = token.chars().count();
    if !(2..=4).contains(&len) {
        return false;
    }
    if !token.chars().all(|c| ('가'..='힣').contains(&c)) {
        return false;
    }
    if DOMAIN_WORDS.contains(&token) {
        return false;
    }
    !elections::KNOWN_PARTIES.contains(&token)
}

/// Surnames covering the vast majority of Korean candidate names. A bare
/// three-syllable token is only taken for a person when it starts with one.
const COMMON_SURNAMES: &[char] = &[
    '김', '이', '박', '최', '정', '강', '조', '윤', '장', '임', '한', '오', '서', '신', '권',
    '황', '안', '송', '전', '홍', '유', '고', '문', '양', '손', '배', '백', '허', '남', '심',
    '노', '하', '곽', '성', '차', '주', '우', '구', '민', '류', '나', '진', '지', '엄', '채',
    '원', '천', '방', '공', '현', '함',
];

/// Candidate names pulled from text and keywords: known figures first, then
/// keywords that read as person names. A free token counts as a name when
/// it directly precedes "후보" in the question, or when it is a
/// three-syllable token starting with a common surname. Region words never
/// qualify.
pub(crate) fn extract_candidate_names(ctx: &InferenceContext<'_>) -> Vec<String> {
    let mut names: Vec<String> = elections::KNOWN_FIGURES
        .iter()
        .filter(|(name, _)| ctx.query.contains(name))
        .map(|(name, _)| name.to_string())
        .collect();
    for kw in ctx.keywords {
        if names.iter().any(|n| n == kw) || !name_like(kw) {
            continue;
        }
        if crate::interpreter::gazetteer::is_region_token(kw) {
            continue;
        }
        let before_hubo =
            ctx.query.contains(&format!("{kw} 후보")) || ctx.query.contains(&format!("{kw}후보"));
        let surname_shaped = kw.chars().count() == 3
            && kw.chars().next().is_some_and(|c| COMMON_SURNAMES.contains(&c));
        if before_hubo || surname_shaped {
            names.push(kw.clone());
        }
    }
    names
}

/// Apply the structured election hint from the parsed query. Runs before
/// free-text inference, after explicit fields.
pub(crate) fn apply_election_hint(
    sg_id: &mut Option<String>,
    sg_typecode: &mut Option<String>,
    hint: Option<&ElectionHint>,
    trail: &mut InferenceTrail,
) {
    let Some(hint) = hint else { return };
    if sg_typecode.is_none() {
        if let Some(code) = &hint.sg_typecode {
            *sg_typecode = Some(code.clone());
        } else if let Some(kind) = &hint.kind {
            if let Some(t) = ElectionType::from_keyword(kind) {
                *sg_typecode = Some(t.code().to_string());
            }
        }
    }
    if sg_id.is_none() {
        if let Some(year) = hint.year {
            let t = sg_typecode.as_deref().and_then(ElectionType::from_code);
            let found = match t {
                Some(t) => elections::by_year_and_type(year, t),
                None => elections::by_year(year),
            };
            if let Some(e) = found {
                *sg_id = Some(e.sg_id.to_string());
                trail.note("sgId", format!("선거 힌트 {year}년 → {}", e.name));
            }
        }
    }
}

/// Elections whose day falls inside the range, oldest first. Compares the
/// 8-digit ids lexically, which is date order.
pub(crate) fn elections_in_range(range: &DateRange) -> Vec<&'static Election> {
    let start = range.start.format("%Y%m%d").to_string();
    let end = range.end.format("%Y%m%d").to_string();
    elections::ELECTIONS
        .iter()
        .filter(|e| e.sg_id >= start.as_str() && e.sg_id <= end.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(query: &'a str, keywords: &'a [String]) -> InferenceContext<'a> {
        InferenceContext { query, keywords }
    }

    #[test]
    fn ladder_prefers_known_figure_over_year() {
        let mut sg_id = None;
        let mut typecode = None;
        let mut trail = InferenceTrail::default();
        infer_election(
            &mut sg_id,
            &mut typecode,
            &ctx("2024년 윤석열 공약", &[]),
            &mut trail,
        );
        assert_eq!(sg_id.as_deref(), Some("20220309"));
        assert_eq!(typecode.as_deref(), Some("1"));
        assert!(trail.get("sgId").unwrap().contains("윤석열"));
    }

    #[test]
    fn ladder_resolves_year_plus_type() {
        let mut sg_id = None;
        let mut typecode = None;
        let mut trail = InferenceTrail::default();
        infer_election(
            &mut sg_id,
            &mut typecode,
            &ctx("2022년 대통령 선거", &[]),
            &mut trail,
        );
        assert_eq!(sg_id.as_deref(), Some("20220309"));
        assert_eq!(typecode.as_deref(), Some("1"));
    }

    #[test]
    fn ladder_falls_back_to_default() {
        let mut sg_id = None;
        let mut typecode = None;
        let mut trail = InferenceTrail::default();
        infer_election(&mut sg_id, &mut typecode, &ctx("아무 정보 없음", &[]), &mut trail);
        assert_eq!(sg_id.as_deref(), Some(elections::DEFAULT_SG_ID));
        assert_eq!(typecode.as_deref(), Some("2"));
        assert!(trail.get("sgId").unwrap().contains("기본값"));
    }

    #[test]
    fn recent_with_type_keyword_disambiguates() {
        let mut sg_id = None;
        let mut typecode = None;
        let mut trail = InferenceTrail::default();
        infer_election(
            &mut sg_id,
            &mut typecode,
            &ctx("최근 대통령 당선인", &[]),
            &mut trail,
        );
        assert_eq!(sg_id.as_deref(), Some("20220309"));
        assert_eq!(typecode.as_deref(), Some("1"));
    }

    #[test]
    fn explicit_sg_id_is_left_alone_and_typecode_reconciled() {
        let mut sg_id = Some("20220601".to_string());
        let mut typecode = None;
        let mut trail = InferenceTrail::default();
        infer_election(&mut sg_id, &mut typecode, &ctx("교육감 후보", &[]), &mut trail);
        assert_eq!(sg_id.as_deref(), Some("20220601"));
        // 교육감 races were held that day, so the keyword wins over the
        // primary race.
        assert_eq!(typecode.as_deref(), Some("8"));
        assert!(trail.get("sgId").is_none());
    }

    #[test]
    fn common_validation_flags_mismatched_typecode() {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        validate_common(Some("20240410"), Some("1"), 1, 100, &mut errors, &mut warnings);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("does not match"), "{}", errors[0]);
    }

    #[test]
    fn common_validation_bounds() {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        validate_common(Some("20240410"), Some("2"), 0, 500, &mut errors, &mut warnings);
        assert_eq!(errors.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn name_like_rejects_domain_words_and_parties() {
        assert!(name_like("김철수"));
        assert!(name_like("이재명"));
        assert!(!name_like("공약"));
        assert!(!name_like("정의당"));
        assert!(!name_like("서울특별시장"));
        assert!(!name_like("abc"));
    }
}
