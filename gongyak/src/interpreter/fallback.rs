//! Deterministic rule interpreter.
//!
//! Runs when the completion path is unavailable or answers garbage. Pure
//! keyword/regex rules over the question text, producing exactly the same
//! `ParsedQuery` schema as the completion path so downstream code never
//! knows which one ran. Infallible: the worst outcome is a low-confidence
//! query with `kind: Unknown`.

use chrono::{Local, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapters::{self, InferenceContext};
use crate::elections::{self, ElectionType};
use crate::interpreter::gazetteer;
use crate::types::{
    DateRange, ElectionHint, OutputFormat, OutputOptions, ParsedQuery, QueryFilters, QueryIntent,
    SourceId, SourceRef,
};

const FETCH_WORDS: &[&str] = &[
    "가져와", "가져오", "조회", "검색", "찾아", "알려", "보여", "확인", "궁금",
];
const CRAWL_WORDS: &[&str] = &["크롤링", "크롤", "스크랩", "수집", "웹사이트", "홈페이지"];
const ANALYZE_WORDS: &[&str] = &["분석", "통계", "요약", "비교"];
const EXPORT_WORDS: &[&str] = &["내보내", "저장", "엑셀", "다운로드"];

/// Literal event words carried into `ElectionHint.kind` as written.
const EVENT_WORDS: &[&str] = &[
    "대통령선거",
    "국회의원선거",
    "교육감선거",
    "재보궐선거",
    "보궐선거",
    "지방선거",
    "총선",
    "대선",
];

const STOPWORDS: &[&str] = &[
    "알려줘",
    "알려주세요",
    "알려주",
    "보여줘",
    "보여주세요",
    "보여주",
    "가져와줘",
    "가져와",
    "조회해줘",
    "검색해줘",
    "찾아줘",
    "해줘",
    "해주세요",
    "주세요",
    "좀",
    "그",
    "이",
    "저",
    "것",
    "그것",
    "이것",
    "저것",
    "뭐",
    "뭐야",
    "무엇",
    "어떻게",
    "언제",
    "어디",
    "누구",
    "왜",
    "및",
    "의",
    "대해",
    "대한",
    "관련",
    "줘",
];

static RECENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"최근\s*(\d+)\s*(개월|달|년)").unwrap());
static SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*년?\s*(?:[~～∼\-]+|부터)\s*(\d{4})\s*년").unwrap());
static FROM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\s*년부터").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"((?:19|20)\d{2})\s*년").unwrap());
static SG_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:19|20)\d{6}").unwrap());
static TOP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"상위\s*(\d+)").unwrap());
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*개(월)?").unwrap());

/// Keyword/regex interpretation with an injectable "today" so relative
/// date ranges stay testable.
pub struct RuleInterpreter {
    today: NaiveDate,
}

impl Default for RuleInterpreter {
    fn default() -> Self {
        Self {
            today: Local::now().date_naive(),
        }
    }
}

impl RuleInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn interpret(&self, text: &str) -> ParsedQuery {
        let trimmed = text.trim();
        let keywords = extract_keywords(trimmed);
        let source = detect_source(trimmed, &keywords);
        let date_range = self.extract_date_range(trimmed);
        let region = gazetteer::find_region(trimmed);
        let election = extract_election_hint(trimmed);
        let parties = elections::parties_in_text(trimmed);
        let party_name = (parties.len() == 1).then(|| parties[0].to_string());
        let sg_id = SG_ID_RE.find(trimmed).map(|m| m.as_str().to_string());
        let confidence = score(
            trimmed,
            source.id.is_some(),
            date_range.is_some(),
            region.is_some(),
        );

        ParsedQuery {
            raw_query: trimmed.to_string(),
            intent: detect_intent(trimmed),
            confidence,
            source,
            filters: QueryFilters {
                date_range,
                region,
                keywords,
                election,
                sg_id,
                party_name,
                custom: serde_json::Map::new(),
            },
            output: detect_output(trimmed),
        }
    }

    fn extract_date_range(&self, text: &str) -> Option<DateRange> {
        if let Some(caps) = RECENT_RE.captures(text) {
            let n: u32 = caps.get(1)?.as_str().parse().ok()?;
            let months = match caps.get(2)?.as_str() {
                "년" => n.checked_mul(12)?,
                _ => n,
            };
            let start = self.today.checked_sub_months(Months::new(months))?;
            return Some(DateRange {
                start,
                end: self.today,
            });
        }
        if let Some(caps) = SPAN_RE.captures(text) {
            let start: i32 = caps.get(1)?.as_str().parse().ok()?;
            let end: i32 = caps.get(2)?.as_str().parse().ok()?;
            return year_range(start, end);
        }
        if let Some(caps) = FROM_RE.captures(text) {
            let start: i32 = caps.get(1)?.as_str().parse().ok()?;
            return Some(DateRange {
                start: NaiveDate::from_ymd_opt(start, 1, 1)?,
                end: self.today,
            });
        }
        if let Some(caps) = YEAR_RE.captures(text) {
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            return year_range(year, year);
        }
        None
    }
}

fn year_range(start_year: i32, end_year: i32) -> Option<DateRange> {
    Some(DateRange {
        start: NaiveDate::from_ymd_opt(start_year, 1, 1)?,
        end: NaiveDate::from_ymd_opt(end_year, 12, 31)?,
    })
}

fn detect_intent(text: &str) -> QueryIntent {
    let lower = text.to_lowercase();
    if FETCH_WORDS.iter().any(|w| text.contains(w)) {
        return QueryIntent::FetchApi;
    }
    if CRAWL_WORDS.iter().any(|w| text.contains(w)) {
        return QueryIntent::CrawlSite;
    }
    if lower.contains("pdf") || (text.contains("문서") && text.contains("파싱")) {
        return QueryIntent::ParsePdf;
    }
    if ANALYZE_WORDS.iter().any(|w| text.contains(w)) {
        return QueryIntent::AnalyzeData;
    }
    if EXPORT_WORDS.iter().any(|w| text.contains(w)) {
        return QueryIntent::ExportData;
    }
    QueryIntent::FetchApi
}

/// Precedence: 당선 and 득표 questions are winner lookups, pledge/policy
/// questions split on whether a candidate name is present, bare 후보 is a
/// roster listing, turnout words land on the statistics service.
fn detect_source(text: &str, keywords: &[String]) -> SourceRef {
    if text.contains("당선") {
        return SourceRef::api(SourceId::Winner);
    }
    if text.contains("득표") {
        return SourceRef::api(SourceId::Winner);
    }
    if text.contains("공약") || text.contains("정책") {
        let ctx = InferenceContext {
            query: text,
            keywords,
        };
        if adapters::extract_candidate_names(&ctx).is_empty() {
            return SourceRef::api(SourceId::PartyPolicy);
        }
        return SourceRef::api(SourceId::Pledge);
    }
    if text.contains("후보") {
        return SourceRef::api(SourceId::Candidate);
    }
    if text.contains("통계")
        || text.contains("선거인수")
        || text.contains("선거인 수")
        || text.contains("투표율")
        || text.contains("투표수")
    {
        return SourceRef::api(SourceId::Stats);
    }
    SourceRef::default()
}

fn extract_keywords(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        .map(str::to_string)
        .take(5)
        .collect()
}

/// Election metadata is only trusted when the text is actually about an
/// election; a bare year in an unrelated question stays a date filter.
fn extract_election_hint(text: &str) -> Option<ElectionHint> {
    if !(text.contains("선거") || text.contains("공약") || text.contains("후보")) {
        return None;
    }
    let year = YEAR_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok());
    let kind = EVENT_WORDS
        .iter()
        .find(|w| text.contains(*w))
        .map(|w| w.to_string());
    let sg_typecode = ElectionType::from_keyword(text).map(|t| t.code().to_string());
    if year.is_none() && kind.is_none() && sg_typecode.is_none() {
        return None;
    }
    Some(ElectionHint {
        year,
        kind,
        sg_typecode,
    })
}

fn detect_output(text: &str) -> OutputOptions {
    let format = if text.contains("표로") || text.contains("테이블") {
        OutputFormat::Table
    } else if text.contains("요약") {
        OutputFormat::Summary
    } else {
        OutputFormat::Json
    };
    OutputOptions {
        format,
        limit: extract_limit(text),
        language: None,
    }
}

fn extract_limit(text: &str) -> Option<u32> {
    if let Some(caps) = TOP_RE.captures(text) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    // "N개" asks for N rows; "N개월" is a duration and must not match.
    for caps in COUNT_RE.captures_iter(text) {
        if caps.get(2).is_none() {
            return caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
    }
    None
}

fn score(text: &str, has_source: bool, has_date: bool, has_region: bool) -> f64 {
    let mut confidence: f64 = 0.5;
    if has_source {
        confidence += 0.2;
    }
    if text.chars().count() >= 10 {
        confidence += 0.1;
    }
    if has_date {
        confidence += 0.1;
    }
    if has_region {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> RuleInterpreter {
        RuleInterpreter::at(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap())
    }

    #[test]
    fn winner_scenario_resolves_event_and_region() {
        let parsed = fixed().interpret("2022년 지방선거 서울시장 당선자");
        assert_eq!(parsed.source.id, Some(SourceId::Winner));
        assert_eq!(parsed.intent, QueryIntent::FetchApi);
        let region = parsed.filters.region.expect("region");
        assert_eq!(region.sido, "서울");
        let hint = parsed.filters.election.expect("election hint");
        assert_eq!(hint.year, Some(2022));
        assert_eq!(hint.kind.as_deref(), Some("지방선거"));
        assert_eq!(hint.sg_typecode.as_deref(), Some("3"));
    }

    #[test]
    fn bare_pledge_question_stays_cheap() {
        let parsed = fixed().interpret("공약 알려줘");
        assert_eq!(parsed.source.id, Some(SourceId::PartyPolicy));
        assert!(parsed.confidence <= 0.7 + f64::EPSILON, "{}", parsed.confidence);
        assert_eq!(parsed.filters.keywords, vec!["공약"]);
    }

    #[test]
    fn named_candidate_pledge_routes_to_pledge_source() {
        let parsed = fixed().interpret("윤석열 공약 알려줘");
        assert_eq!(parsed.source.id, Some(SourceId::Pledge));
    }

    #[test]
    fn vote_share_routes_to_winner() {
        let parsed = fixed().interpret("이재명 득표율 알려줘");
        assert_eq!(parsed.source.id, Some(SourceId::Winner));
    }

    #[test]
    fn turnout_statistics_route_to_stats() {
        let parsed = fixed().interpret("최근 지방선거 서울 투표율 통계");
        assert_eq!(parsed.source.id, Some(SourceId::Stats));
    }

    #[test]
    fn unknown_domain_has_no_source() {
        let parsed = fixed().interpret("날씨 데이터 가져와");
        assert_eq!(parsed.source.id, None);
        assert_eq!(parsed.intent, QueryIntent::FetchApi);
    }

    #[test]
    fn crawl_intent_without_fetch_words() {
        let parsed = fixed().interpret("선관위 사이트 크롤링");
        assert_eq!(parsed.intent, QueryIntent::CrawlSite);
    }

    #[test]
    fn analyze_intent_without_fetch_words() {
        let parsed = fixed().interpret("정당별 공약 비교 분석");
        assert_eq!(parsed.intent, QueryIntent::AnalyzeData);
    }

    #[test]
    fn recent_months_anchor_on_today() {
        let parsed = fixed().interpret("최근 3개월 공약 가져와");
        let range = parsed.filters.date_range.expect("date range");
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
    }

    #[test]
    fn year_span_covers_both_full_years() {
        let parsed = fixed().interpret("2020년~2022년 정당 정책 알려줘");
        let range = parsed.filters.date_range.expect("date range");
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn open_ended_from_year_ends_today() {
        let parsed = fixed().interpret("2020년부터 공약 검색");
        let range = parsed.filters.date_range.expect("date range");
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
    }

    #[test]
    fn keywords_capped_and_stoppered() {
        let parsed =
            fixed().interpret("서울 부산 대구 인천 광주 대전 울산 후보 알려줘");
        assert_eq!(parsed.filters.keywords.len(), 5);
        assert!(!parsed.filters.keywords.iter().any(|k| k == "알려줘"));
    }

    #[test]
    fn confidence_grows_with_signal_within_bounds() {
        let sparse = fixed().interpret("공약");
        let rich = fixed().interpret("2022년 서울 후보 공약 자세히 알려줘");
        assert!(sparse.confidence < rich.confidence);
        assert!(rich.confidence <= 1.0);
    }

    #[test]
    fn single_party_fills_party_name() {
        let parsed = fixed().interpret("더불어민주당 정책 알려줘");
        assert_eq!(parsed.filters.party_name.as_deref(), Some("더불어민주당"));
        assert_eq!(parsed.source.id, Some(SourceId::PartyPolicy));
    }

    #[test]
    fn explicit_sg_id_is_picked_up() {
        let parsed = fixed().interpret("20240410 선거 후보 알려줘");
        assert_eq!(parsed.filters.sg_id.as_deref(), Some("20240410"));
    }

    #[test]
    fn limit_from_count_but_not_duration() {
        let parsed = fixed().interpret("공약 3개만 보여줘");
        assert_eq!(parsed.output.limit, Some(3));
        let parsed = fixed().interpret("최근 3개월 공약 보여줘");
        assert_eq!(parsed.output.limit, None);
    }

    #[test]
    fn table_output_detected() {
        let parsed = fixed().interpret("후보 명단 표로 보여줘");
        assert_eq!(parsed.output.format, OutputFormat::Table);
    }
}
