//! Shared data model for the query pipeline.
//!
//! `ParsedQuery` is the structured form of a natural-language question and
//! is produced exactly once per request, either by the LLM path or by the
//! deterministic rule interpreter — both emit the same schema. Wire-facing
//! structs use camelCase field names so the JSON contract matches what the
//! completion service is asked to return.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What the user wants done with the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    FetchApi,
    CrawlSite,
    ParsePdf,
    AnalyzeData,
    ExportData,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchApi => "fetch_api",
            Self::CrawlSite => "crawl_site",
            Self::ParsePdf => "parse_pdf",
            Self::AnalyzeData => "analyze_data",
            Self::ExportData => "export_data",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the answer is expected to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Api,
    Crawler,
    Local,
    #[default]
    Unknown,
}

/// The fixed catalogue of upstream source families this pipeline knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// Candidate election pledges (선거공약).
    #[serde(rename = "public_data_pledge")]
    Pledge,
    /// Party policy pledges (정당정책).
    #[serde(rename = "public_data_party_policy")]
    PartyPolicy,
    /// Candidate roster (후보자 명부).
    #[serde(rename = "public_data_candidate")]
    Candidate,
    /// Election winners (당선인), including the vote-share sub-mode.
    #[serde(rename = "public_data_winner")]
    Winner,
    /// Election statistics such as turnout and elector counts.
    #[serde(rename = "public_data_stats")]
    Stats,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pledge => "public_data_pledge",
            Self::PartyPolicy => "public_data_party_policy",
            Self::Candidate => "public_data_candidate",
            Self::Winner => "public_data_winner",
            Self::Stats => "public_data_stats",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public_data_pledge" => Some(Self::Pledge),
            "public_data_party_policy" => Some(Self::PartyPolicy),
            "public_data_candidate" => Some(Self::Candidate),
            "public_data_winner" => Some(Self::Winner),
            "public_data_stats" => Some(Self::Stats),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pledge => "후보자 선거공약",
            Self::PartyPolicy => "정당 정책공약",
            Self::Candidate => "후보자 명부",
            Self::Winner => "당선인 정보",
            Self::Stats => "선거 통계",
        }
    }

    /// Logical endpoint key under which the catalog registers this source's
    /// primary operation.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Pledge => "pledges",
            Self::PartyPolicy => "policies",
            Self::Candidate => "roster",
            Self::Winner => "winners",
            Self::Stats => "turnout",
        }
    }

    pub fn all() -> [SourceId; 5] {
        [
            Self::Pledge,
            Self::PartyPolicy,
            Self::Candidate,
            Self::Winner,
            Self::Stats,
        ]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source reference carried inside a parsed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SourceId>,
}

impl SourceRef {
    pub fn api(id: SourceId) -> Self {
        Self {
            kind: SourceKind::Api,
            id: Some(id),
        }
    }
}

/// Inclusive date range, ISO `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

/// A region filter. The completion service may answer with either a bare
/// province string (`"서울"`) or the structured form; both deserialize into
/// the structured one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub sido: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigungu: Option<String>,
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full {
                sido: String,
                #[serde(default)]
                sigungu: Option<String>,
            },
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Name(sido) => Region {
                sido,
                sigungu: None,
            },
            Repr::Full { sido, sigungu } => Region { sido, sigungu },
        })
    }
}

/// Election hint extracted from the question text. `kind` keeps the literal
/// event word that matched (e.g. "지방선거"); `sg_typecode` is the resolved
/// type code when a position/type keyword pinned it down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElectionHint {
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sg_typecode: Option<String>,
}

/// Generic, source-agnostic filter bag. Adapters translate this into the
/// exact parameter shape each upstream wants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryFilters {
    pub date_range: Option<DateRange>,
    pub region: Option<Region>,
    pub keywords: Vec<String>,
    pub election: Option<ElectionHint>,
    pub sg_id: Option<String>,
    pub party_name: Option<String>,
    /// Source-specific overrides already known by the caller, passed through
    /// untouched (e.g. an explicit `cnddtId`).
    pub custom: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub limit: Option<u32>,
    pub language: Option<String>,
}

/// The structured form of one natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub raw_query: String,
    pub intent: QueryIntent,
    pub confidence: f64,
    #[serde(default)]
    pub source: SourceRef,
    #[serde(default)]
    pub filters: QueryFilters,
    #[serde(default)]
    pub output: OutputOptions,
}

impl ParsedQuery {
    /// A minimal fetch query against one source, used by tests and by
    /// callers that already know what they want.
    pub fn fetch(raw_query: impl Into<String>, id: SourceId) -> Self {
        Self {
            raw_query: raw_query.into(),
            intent: QueryIntent::FetchApi,
            confidence: 1.0,
            source: SourceRef::api(id),
            filters: QueryFilters::default(),
            output: OutputOptions::default(),
        }
    }
}

/// One numbered pledge/policy item (공약).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PledgeItem {
    pub order: u32,
    pub realm: String,
    pub title: String,
    pub content: String,
}

/// Canonical candidate-pledge record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeRecord {
    pub sg_id: String,
    #[serde(default)]
    pub sg_typecode: String,
    pub candidate_id: String,
    pub candidate_name: String,
    #[serde(default)]
    pub party_name: String,
    pub pledge_count: u32,
    pub pledges: Vec<PledgeItem>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

/// Canonical party-policy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPolicyRecord {
    pub sg_id: String,
    pub party_name: String,
    pub policy_count: u32,
    pub items: Vec<PledgeItem>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

/// Canonical candidate-roster record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub candidate_id: String,
    pub sg_id: String,
    #[serde(default)]
    pub sg_typecode: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hanja_name: Option<String>,
    #[serde(default)]
    pub party_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sido: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gugun: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

/// Canonical winner record. `votes`/`vote_rate` feed the vote-share mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub candidate_id: String,
    pub sg_id: String,
    #[serde(default)]
    pub sg_typecode: String,
    pub name: String,
    #[serde(default)]
    pub party_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sido: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gugun: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

/// Canonical statistics record (turnout / elector counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    pub sg_id: String,
    #[serde(default)]
    pub sg_typecode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sido: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gugun: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elector_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnout: Option<f64>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

/// One canonical record, tagged with the source family it came from. The
/// original upstream payload is preserved under `raw` for traceability;
/// nothing in this core ever persists these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recordType", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Pledge(PledgeRecord),
    PartyPolicy(PartyPolicyRecord),
    Candidate(CandidateRecord),
    Winner(WinnerRecord),
    Statistic(StatRecord),
}

impl NormalizedRecord {
    pub fn sg_id(&self) -> &str {
        match self {
            Self::Pledge(r) => &r.sg_id,
            Self::PartyPolicy(r) => &r.sg_id,
            Self::Candidate(r) => &r.sg_id,
            Self::Winner(r) => &r.sg_id,
            Self::Statistic(r) => &r.sg_id,
        }
    }

    /// Stamp the election id a fan-out combination was issued for, so merged
    /// items stay attributable.
    pub fn tag_election(&mut self, sg_id: &str) {
        let slot = match self {
            Self::Pledge(r) => &mut r.sg_id,
            Self::PartyPolicy(r) => &mut r.sg_id,
            Self::Candidate(r) => &mut r.sg_id,
            Self::Winner(r) => &mut r.sg_id,
            Self::Statistic(r) => &mut r.sg_id,
        };
        if slot.is_empty() {
            *slot = sg_id.to_string();
        }
    }
}

/// Canonical response shape every adapter's `normalize` produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub success: bool,
    pub total_count: u64,
    pub data: Vec<NormalizedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NormalizedResponse {
    pub fn empty() -> Self {
        Self {
            success: true,
            total_count: 0,
            data: Vec::new(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_count: 0,
            data: Vec::new(),
            error: Some(error.into()),
        }
    }
}
