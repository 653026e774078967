//! Response normalization for data.go.kr payloads.
//!
//! Every upstream wraps rows in the same envelope,
//! `{response: {header: {resultCode, resultMsg}, body: {items: {item: …}, totalCount}}}`,
//! with a handful of historical quirks: a lone row arrives as an object
//! instead of an array, an empty result set arrives as `"items": ""`, and
//! several concepts appear under two or three field names depending on the
//! service generation. This module folds all of that into one canonical
//! shape and is idempotent: feeding it its own output returns the same
//! records.

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{
    CandidateRecord, NormalizedRecord, NormalizedResponse, PartyPolicyRecord, PledgeItem,
    PledgeRecord, SourceId, StatRecord, WinnerRecord,
};

/// Numbered pledge fields never go past this, whatever `prmsCnt` claims.
pub const MAX_PLEDGE_FIELDS: u64 = 10;

/// Field-name aliases, canonical name first so already-normalized values
/// resolve to themselves.
pub const CANDIDATE_ID_ALIASES: &[&str] = &["candidateId", "cnddtId", "huboid"];
pub const SG_ID_ALIASES: &[&str] = &["sgId", "sg_id"];
pub const SG_TYPECODE_ALIASES: &[&str] = &["sgTypecode", "sgTypeCode"];
pub const NAME_ALIASES: &[&str] = &["name", "krName"];
pub const CANDIDATE_NAME_ALIASES: &[&str] = &["candidateName", "krName", "name"];
pub const PARTY_ALIASES: &[&str] = &["partyName", "jdName"];
pub const SIDO_ALIASES: &[&str] = &["sido", "sdName"];
pub const GUGUN_ALIASES: &[&str] = &["gugun", "wiwName"];
pub const DISTRICT_ALIASES: &[&str] = &["district", "sggName"];
pub const VOTES_ALIASES: &[&str] = &["votes", "dugsu"];
pub const VOTE_RATE_ALIASES: &[&str] = &["voteRate", "dugyul"];
pub const ELECTOR_ALIASES: &[&str] = &["electorCount", "sunCnt", "elcntCnt"];
pub const VOTE_COUNT_ALIASES: &[&str] = &["voteCount", "tuCnt"];
pub const TURNOUT_ALIASES: &[&str] = &["turnout", "tuRatio", "tuRate"];

/// Outcome of peeling the envelope off a raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Rows extracted, with the upstream's declared total when present.
    Rows { items: Vec<Value>, total_count: u64 },
    /// Header said "no data". Not an error.
    NoData,
    /// Header carried a real error code.
    Error { code: String, message: String },
}

/// Normalize one raw upstream payload for the given source family.
pub fn normalize_payload(source: SourceId, payload: &Value) -> NormalizedResponse {
    // Already-canonical payloads pass through untouched.
    if let Ok(done) = serde_json::from_value::<NormalizedResponse>(payload.clone()) {
        return done;
    }
    if let Some(records) = parse_canonical_records(payload) {
        let total_count = records.len() as u64;
        return NormalizedResponse {
            success: true,
            total_count,
            data: records,
            error: None,
        };
    }

    match extract_envelope(payload) {
        Envelope::NoData => NormalizedResponse::empty(),
        Envelope::Error { message, .. } => NormalizedResponse::failed(message),
        Envelope::Rows { items, total_count } => {
            let mut data = Vec::with_capacity(items.len());
            for item in &items {
                match build_record(source, item) {
                    Some(record) => data.push(record),
                    None => warn!("skipping malformed {} row", source),
                }
            }
            NormalizedResponse {
                success: true,
                total_count: total_count.max(data.len() as u64),
                data,
                error: None,
            }
        }
    }
}

/// Peel the data.go.kr envelope. Accepts pre-extracted arrays as-is.
pub fn extract_envelope(payload: &Value) -> Envelope {
    if let Some(items) = payload.as_array() {
        return Envelope::Rows {
            items: items.clone(),
            total_count: items.len() as u64,
        };
    }

    let Some(response) = payload.get("response") else {
        // Flattened object with an `items` key but no envelope.
        if let Some(items) = payload.get("items") {
            let items = coerce_items(items);
            let total_count = items.len() as u64;
            return Envelope::Rows { items, total_count };
        }
        return Envelope::Error {
            code: "99".to_string(),
            message: describe_result_code("99", Some("unrecognized payload shape")),
        };
    };

    let code = response
        .pointer("/header/resultCode")
        .and_then(Value::as_str)
        .unwrap_or("99")
        .to_string();
    let upstream_msg = response
        .pointer("/header/resultMsg")
        .and_then(Value::as_str)
        .map(str::to_string);

    if is_no_data_code(&code) {
        return Envelope::NoData;
    }
    if !is_success_code(&code) {
        return Envelope::Error {
            message: describe_result_code(&code, upstream_msg.as_deref()),
            code,
        };
    }

    let body = response.get("body");
    let items = body
        .and_then(|b| b.get("items"))
        .map(coerce_items)
        .unwrap_or_default();
    let total_count = body
        .and_then(|b| b.get("totalCount"))
        .and_then(value_as_u64)
        .unwrap_or(items.len() as u64);
    Envelope::Rows { items, total_count }
}

/// `items` may be `{item: [..]}`, `{item: {..}}`, a bare array, or the
/// empty-string quirk used when there are no rows.
fn coerce_items(items: &Value) -> Vec<Value> {
    match items {
        Value::Array(rows) => rows.clone(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::Object(obj) => match obj.get("item") {
            Some(Value::Array(rows)) => rows.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![single.clone()],
        },
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    }
}

pub fn is_success_code(code: &str) -> bool {
    matches!(strip_code_prefix(code), "00" | "0")
}

pub fn is_no_data_code(code: &str) -> bool {
    matches!(strip_code_prefix(code), "03")
}

fn strip_code_prefix(code: &str) -> &str {
    code.rsplit('-').next().unwrap_or(code)
}

/// data.go.kr result-code dictionary, folded into a human-readable message.
pub fn describe_result_code(code: &str, upstream_msg: Option<&str>) -> String {
    let label = match strip_code_prefix(code) {
        "01" => "제공기관 서비스 오류 (APPLICATION_ERROR)",
        "04" => "HTTP 오류 (HTTP_ERROR)",
        "12" => "해당 오픈API 서비스가 없거나 폐기됨 (NO_OPENAPI_SERVICE_ERROR)",
        "20" => "서비스 접근 거부 (SERVICE_ACCESS_DENIED_ERROR)",
        "22" => "일일 요청 한도 초과 (LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR)",
        "30" => "등록되지 않은 서비스키 (SERVICE_KEY_IS_NOT_REGISTERED_ERROR)",
        "31" => "서비스키 활용기간 만료 (DEADLINE_HAS_EXPIRED_ERROR)",
        "32" => "등록되지 않은 IP (UNREGISTERED_IP_ERROR)",
        "99" => "알 수 없는 오류 (UNKNOWN_ERROR)",
        _ => "정의되지 않은 응답 코드",
    };
    match upstream_msg {
        Some(msg) if !msg.is_empty() => format!("{code} {label}: {msg}"),
        _ => format!("{code} {label}"),
    }
}

/// First present alias wins; canonical names sit first in every alias list.
pub fn pick_value<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| obj.get(*key))
}

/// String form of the first present alias. Numbers are stringified since
/// several services flip between string and numeric encodings of ids.
pub fn pick_string(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    string_of(pick_value(obj, aliases)?)
}

fn field_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    string_of(obj.get(key)?)
}

fn string_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn pick_u64(obj: &Map<String, Value>, aliases: &[&str]) -> Option<u64> {
    value_as_u64(pick_value(obj, aliases)?)
}

pub fn pick_f64(obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    value_as_f64(pick_value(obj, aliases)?)
}

fn value_as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

/// Reassemble `prmsRealmName1..10` / `prmsTitle1..10` / `prmsCont1..10`
/// into ordered pledge items, stopping at `min(prmsCnt, 10)`.
pub fn assemble_pledge_items(obj: &Map<String, Value>) -> Vec<PledgeItem> {
    let declared = pick_u64(obj, &["prmsCnt"]).unwrap_or(MAX_PLEDGE_FIELDS);
    let cap = declared.min(MAX_PLEDGE_FIELDS);
    let mut items = Vec::new();
    for n in 1..=cap {
        let realm = field_string(obj, &format!("prmsRealmName{n}"));
        let title = field_string(obj, &format!("prmsTitle{n}"));
        let content = field_string(obj, &format!("prmsCont{n}"));
        if title.is_none() && content.is_none() {
            continue;
        }
        items.push(PledgeItem {
            order: n as u32,
            realm: realm.unwrap_or_default(),
            title: title.unwrap_or_default(),
            content: content.unwrap_or_default(),
        });
    }
    items
}

fn build_record(source: SourceId, item: &Value) -> Option<NormalizedRecord> {
    let obj = item.as_object()?;
    match source {
        SourceId::Pledge => pledge_record(obj).map(NormalizedRecord::Pledge),
        SourceId::PartyPolicy => party_policy_record(obj).map(NormalizedRecord::PartyPolicy),
        SourceId::Candidate => candidate_record(obj).map(NormalizedRecord::Candidate),
        SourceId::Winner => winner_record(obj).map(NormalizedRecord::Winner),
        SourceId::Stats => stat_record(obj).map(NormalizedRecord::Statistic),
    }
}

pub fn pledge_record(obj: &Map<String, Value>) -> Option<PledgeRecord> {
    let pledges = assemble_pledge_items(obj);
    Some(PledgeRecord {
        sg_id: pick_string(obj, SG_ID_ALIASES).unwrap_or_default(),
        sg_typecode: pick_string(obj, SG_TYPECODE_ALIASES).unwrap_or_default(),
        candidate_id: pick_string(obj, CANDIDATE_ID_ALIASES)?,
        candidate_name: pick_string(obj, CANDIDATE_NAME_ALIASES).unwrap_or_default(),
        party_name: pick_string(obj, PARTY_ALIASES).unwrap_or_default(),
        pledge_count: pick_u64(obj, &["prmsCnt"]).unwrap_or(pledges.len() as u64) as u32,
        pledges,
        raw: Value::Object(obj.clone()),
    })
}

pub fn party_policy_record(obj: &Map<String, Value>) -> Option<PartyPolicyRecord> {
    let items = assemble_pledge_items(obj);
    Some(PartyPolicyRecord {
        sg_id: pick_string(obj, SG_ID_ALIASES).unwrap_or_default(),
        party_name: pick_string(obj, PARTY_ALIASES)?,
        policy_count: pick_u64(obj, &["prmsCnt"]).unwrap_or(items.len() as u64) as u32,
        items,
        raw: Value::Object(obj.clone()),
    })
}

pub fn candidate_record(obj: &Map<String, Value>) -> Option<CandidateRecord> {
    Some(CandidateRecord {
        candidate_id: pick_string(obj, CANDIDATE_ID_ALIASES)?,
        sg_id: pick_string(obj, SG_ID_ALIASES).unwrap_or_default(),
        sg_typecode: pick_string(obj, SG_TYPECODE_ALIASES).unwrap_or_default(),
        name: pick_string(obj, NAME_ALIASES)?,
        hanja_name: pick_string(obj, &["hanjaName"]),
        party_name: pick_string(obj, PARTY_ALIASES).unwrap_or_default(),
        district: pick_string(obj, DISTRICT_ALIASES),
        sido: pick_string(obj, SIDO_ALIASES),
        gugun: pick_string(obj, GUGUN_ALIASES),
        ballot_no: pick_string(obj, &["ballotNo", "giho"]),
        gender: pick_string(obj, &["gender"]),
        birthday: pick_string(obj, &["birthday"]),
        age: pick_string(obj, &["age"]),
        job: pick_string(obj, &["job"]),
        edu: pick_string(obj, &["edu"]),
        career1: pick_string(obj, &["career1"]),
        career2: pick_string(obj, &["career2"]),
        status: pick_string(obj, &["status"]),
        raw: Value::Object(obj.clone()),
    })
}

pub fn winner_record(obj: &Map<String, Value>) -> Option<WinnerRecord> {
    Some(WinnerRecord {
        candidate_id: pick_string(obj, CANDIDATE_ID_ALIASES).unwrap_or_default(),
        sg_id: pick_string(obj, SG_ID_ALIASES).unwrap_or_default(),
        sg_typecode: pick_string(obj, SG_TYPECODE_ALIASES).unwrap_or_default(),
        name: pick_string(obj, NAME_ALIASES)?,
        party_name: pick_string(obj, PARTY_ALIASES).unwrap_or_default(),
        district: pick_string(obj, DISTRICT_ALIASES),
        sido: pick_string(obj, SIDO_ALIASES),
        gugun: pick_string(obj, GUGUN_ALIASES),
        votes: pick_u64(obj, VOTES_ALIASES),
        vote_rate: pick_f64(obj, VOTE_RATE_ALIASES),
        raw: Value::Object(obj.clone()),
    })
}

pub fn stat_record(obj: &Map<String, Value>) -> Option<StatRecord> {
    let elector_count = pick_u64(obj, ELECTOR_ALIASES);
    let vote_count = pick_u64(obj, VOTE_COUNT_ALIASES);
    let turnout = pick_f64(obj, TURNOUT_ALIASES).or_else(|| match (elector_count, vote_count) {
        (Some(e), Some(v)) if e > 0 => Some(v as f64 / e as f64 * 100.0),
        _ => None,
    });
    Some(StatRecord {
        sg_id: pick_string(obj, SG_ID_ALIASES).unwrap_or_default(),
        sg_typecode: pick_string(obj, SG_TYPECODE_ALIASES).unwrap_or_default(),
        sido: pick_string(obj, SIDO_ALIASES),
        gugun: pick_string(obj, GUGUN_ALIASES),
        elector_count,
        vote_count,
        turnout,
        raw: Value::Object(obj.clone()),
    })
}

fn parse_canonical_records(payload: &Value) -> Option<Vec<NormalizedRecord>> {
    let rows = payload.as_array()?;
    if rows.is_empty() {
        return None;
    }
    rows.iter()
        .map(|row| serde_json::from_value(row.clone()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(code: &str, msg: &str, items: Value, total: u64) -> Value {
        json!({
            "response": {
                "header": {"resultCode": code, "resultMsg": msg},
                "body": {"items": items, "totalCount": total}
            }
        })
    }

    #[test]
    fn lone_item_object_becomes_single_row() {
        let payload = envelope(
            "INFO-00",
            "NORMAL SERVICE",
            json!({"item": {"huboid": "100", "name": "김철수", "sgId": "20220309"}}),
            1,
        );
        let out = normalize_payload(SourceId::Candidate, &payload);
        assert!(out.success);
        assert_eq!(out.total_count, 1);
        assert_eq!(out.data.len(), 1);
        match &out.data[0] {
            NormalizedRecord::Candidate(c) => {
                assert_eq!(c.candidate_id, "100");
                assert_eq!(c.name, "김철수");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn no_data_code_is_success_with_empty_data() {
        let payload = envelope("INFO-03", "NODATA_ERROR", json!(""), 0);
        let out = normalize_payload(SourceId::Winner, &payload);
        assert!(out.success);
        assert!(out.data.is_empty());
        assert!(out.error.is_none());
    }

    #[test]
    fn empty_string_items_quirk_yields_no_rows() {
        let payload = envelope("INFO-00", "NORMAL SERVICE", json!(""), 0);
        let out = normalize_payload(SourceId::Winner, &payload);
        assert!(out.success);
        assert!(out.data.is_empty());
    }

    #[test]
    fn error_code_maps_through_dictionary() {
        let payload = envelope("ERROR-30", "SERVICE KEY IS NOT REGISTERED", json!(""), 0);
        let out = normalize_payload(SourceId::Pledge, &payload);
        assert!(!out.success);
        let err = out.error.unwrap();
        assert!(err.contains("등록되지 않은 서비스키"), "{err}");
        assert!(err.contains("SERVICE KEY IS NOT REGISTERED"), "{err}");
    }

    #[test]
    fn alias_priority_is_canonical_first() {
        let obj = json!({"candidateId": "1", "cnddtId": "2", "huboid": "3"});
        let picked = pick_string(obj.as_object().unwrap(), CANDIDATE_ID_ALIASES);
        assert_eq!(picked.as_deref(), Some("1"));
        let legacy = json!({"huboid": "3"});
        assert_eq!(
            pick_string(legacy.as_object().unwrap(), CANDIDATE_ID_ALIASES).as_deref(),
            Some("3")
        );
    }

    #[test]
    fn numbered_fields_stop_at_declared_count() {
        let obj = json!({
            "prmsCnt": 2,
            "prmsRealmName1": "경제", "prmsTitle1": "일자리", "prmsCont1": "내용1",
            "prmsRealmName2": "복지", "prmsTitle2": "돌봄", "prmsCont2": "내용2",
            "prmsRealmName3": "유령", "prmsTitle3": "무시되어야 함", "prmsCont3": "내용3"
        });
        let items = assemble_pledge_items(obj.as_object().unwrap());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].order, 1);
        assert_eq!(items[1].title, "돌봄");
    }

    #[test]
    fn numbered_fields_cap_at_ten() {
        let mut obj = Map::new();
        obj.insert("prmsCnt".into(), json!(25));
        for n in 1..=12 {
            obj.insert(format!("prmsTitle{n}"), json!(format!("공약 {n}")));
        }
        let items = assemble_pledge_items(&obj);
        assert_eq!(items.len(), 10);
        assert_eq!(items.last().unwrap().order, 10);
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = envelope(
            "INFO-00",
            "NORMAL SERVICE",
            json!({"item": [
                {"huboid": "100100", "krName": "이몽룡", "jdName": "가나당",
                 "sgId": "20220309", "sgTypecode": "1", "dugsu": "1,234,567", "dugyul": 48.6}
            ]}),
            1,
        );
        let first = normalize_payload(SourceId::Winner, &payload);
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = normalize_payload(SourceId::Winner, &reserialized);
        assert_eq!(first, second);
        match &first.data[0] {
            NormalizedRecord::Winner(w) => {
                assert_eq!(w.votes, Some(1_234_567));
                assert_eq!(w.vote_rate, Some(48.6));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn preextracted_array_passes_straight_through() {
        let payload = json!([
            {"name": "성춘향", "huboid": "200", "sgId": "20220601"}
        ]);
        let out = normalize_payload(SourceId::Candidate, &payload);
        assert!(out.success);
        assert_eq!(out.data.len(), 1);
    }

    #[test]
    fn turnout_is_derived_when_absent() {
        let obj = json!({"sgId": "20240410", "sdName": "서울", "sunCnt": "1000", "tuCnt": "770"});
        let rec = stat_record(obj.as_object().unwrap()).unwrap();
        assert_eq!(rec.elector_count, Some(1000));
        assert_eq!(rec.vote_count, Some(770));
        assert!((rec.turnout.unwrap() - 77.0).abs() < 1e-9);
    }
}
