//! Canned upstream payloads for keyless demo mode.
//!
//! Rows mimic the live services field-for-field (legacy key names, the
//! lone-object single-row quirk, `"items": ""` for empty sets) so the rest
//! of the pipeline cannot tell the difference. Responses built from here are
//! flagged `isStubData` by the pipeline.

use serde_json::{json, Value};

use crate::connector::ApiRequest;
use crate::types::SourceId;

struct StubCandidate {
    id: &'static str,
    sg_id: &'static str,
    typecode: &'static str,
    name: &'static str,
    hanja: &'static str,
    party: &'static str,
    giho: &'static str,
    sgg: &'static str,
    sido: &'static str,
    gugun: &'static str,
    gender: &'static str,
    birthday: &'static str,
    age: &'static str,
    job: &'static str,
}

const CANDIDATES: &[StubCandidate] = &[
    StubCandidate {
        id: "100089893",
        sg_id: "20220309",
        typecode: "1",
        name: "이재명",
        hanja: "李在明",
        party: "더불어민주당",
        giho: "1",
        sgg: "대한민국",
        sido: "",
        gugun: "",
        gender: "남",
        birthday: "1964-12-22",
        age: "57",
        job: "정당인",
    },
    StubCandidate {
        id: "100089895",
        sg_id: "20220309",
        typecode: "1",
        name: "윤석열",
        hanja: "尹錫悅",
        party: "국민의힘",
        giho: "2",
        sgg: "대한민국",
        sido: "",
        gugun: "",
        gender: "남",
        birthday: "1960-12-18",
        age: "61",
        job: "정당인",
    },
    StubCandidate {
        id: "100089897",
        sg_id: "20220309",
        typecode: "1",
        name: "심상정",
        hanja: "沈相奵",
        party: "정의당",
        giho: "3",
        sgg: "대한민국",
        sido: "",
        gugun: "",
        gender: "여",
        birthday: "1959-02-20",
        age: "63",
        job: "국회의원",
    },
    StubCandidate {
        id: "100089899",
        sg_id: "20220309",
        typecode: "1",
        name: "안철수",
        hanja: "安哲秀",
        party: "국민의당",
        giho: "4",
        sgg: "대한민국",
        sido: "",
        gugun: "",
        gender: "남",
        birthday: "1962-02-26",
        age: "60",
        job: "국회의원",
    },
    StubCandidate {
        id: "100158001",
        sg_id: "20220601",
        typecode: "3",
        name: "오세훈",
        hanja: "吳世勳",
        party: "국민의힘",
        giho: "2",
        sgg: "서울특별시",
        sido: "서울특별시",
        gugun: "",
        gender: "남",
        birthday: "1961-01-04",
        age: "61",
        job: "서울특별시장",
    },
    StubCandidate {
        id: "100158002",
        sg_id: "20220601",
        typecode: "3",
        name: "송영길",
        hanja: "宋永吉",
        party: "더불어민주당",
        giho: "1",
        sgg: "서울특별시",
        sido: "서울특별시",
        gugun: "",
        gender: "남",
        birthday: "1963-03-21",
        age: "59",
        job: "정당인",
    },
    StubCandidate {
        id: "100158101",
        sg_id: "20220601",
        typecode: "3",
        name: "김동연",
        hanja: "金東兗",
        party: "더불어민주당",
        giho: "1",
        sgg: "경기도",
        sido: "경기도",
        gugun: "",
        gender: "남",
        birthday: "1957-01-28",
        age: "65",
        job: "정당인",
    },
    StubCandidate {
        id: "100158102",
        sg_id: "20220601",
        typecode: "3",
        name: "김은혜",
        hanja: "金恩慧",
        party: "국민의힘",
        giho: "2",
        sgg: "경기도",
        sido: "경기도",
        gugun: "",
        gender: "여",
        birthday: "1971-05-06",
        age: "51",
        job: "국회의원",
    },
    StubCandidate {
        id: "100200001",
        sg_id: "20240410",
        typecode: "2",
        name: "곽상언",
        hanja: "郭尙彦",
        party: "더불어민주당",
        giho: "1",
        sgg: "종로구",
        sido: "서울특별시",
        gugun: "종로구",
        gender: "남",
        birthday: "1971-11-18",
        age: "52",
        job: "변호사",
    },
    StubCandidate {
        id: "100200002",
        sg_id: "20240410",
        typecode: "2",
        name: "최재형",
        hanja: "崔在亨",
        party: "국민의힘",
        giho: "2",
        sgg: "종로구",
        sido: "서울특별시",
        gugun: "종로구",
        gender: "남",
        birthday: "1956-09-02",
        age: "67",
        job: "국회의원",
    },
];

struct StubPledges {
    candidate_id: &'static str,
    items: &'static [(&'static str, &'static str, &'static str)],
}

const PLEDGES: &[StubPledges] = &[
    StubPledges {
        candidate_id: "100089893",
        items: &[
            ("경제", "기본소득 도입", "전 국민 기본소득을 단계적으로 도입하겠습니다."),
            ("주거", "기본주택 공급", "임기 내 기본주택 100만호를 공급하겠습니다."),
            ("복지", "아동수당 확대", "아동수당 지급 연령을 만 18세까지 확대하겠습니다."),
        ],
    },
    StubPledges {
        candidate_id: "100089895",
        items: &[
            ("부동산", "주택공급 확대", "수도권 중심으로 주택 250만호를 공급하겠습니다."),
            ("경제", "규제 개혁", "기업 활동을 제약하는 규제를 전면 재검토하겠습니다."),
            ("복지", "기초연금 인상", "기초연금을 월 40만원으로 인상하겠습니다."),
        ],
    },
    StubPledges {
        candidate_id: "100089897",
        items: &[
            ("노동", "주4일제 도입", "주4일제 시범사업을 시작하겠습니다."),
            ("기후", "탈탄소 전환", "2030년까지 온실가스 50% 감축을 추진하겠습니다."),
            ("복지", "전국민 돌봄보장", "국가가 책임지는 돌봄체계를 만들겠습니다."),
        ],
    },
    StubPledges {
        candidate_id: "100089899",
        items: &[
            ("과학", "과학기술 중심국가", "과학기술부총리제를 도입하겠습니다."),
            ("경제", "중소벤처 지원", "혁신 벤처 생태계에 집중 투자하겠습니다."),
            ("정치", "정치개혁", "제왕적 대통령제를 분권형으로 개편하겠습니다."),
        ],
    },
    StubPledges {
        candidate_id: "100158001",
        items: &[
            ("주거", "재개발 정상화", "민간 재개발·재건축을 정상화하겠습니다."),
            ("교통", "지하철 연장", "지하철 노선 연장으로 교통 사각지대를 해소하겠습니다."),
            ("복지", "안심소득 시범", "안심소득 시범사업을 확대하겠습니다."),
        ],
    },
    StubPledges {
        candidate_id: "100158101",
        items: &[
            ("경제", "경기북부특별자치도", "경기북부특별자치도 설치를 추진하겠습니다."),
            ("교통", "GTX 플러스", "GTX 노선 확대와 교통요금 지원을 추진하겠습니다."),
            ("청년", "청년 기회사다리", "청년 기회소득과 기회사다리금융을 도입하겠습니다."),
        ],
    },
];

struct StubPolicy {
    sg_id: &'static str,
    party: &'static str,
    items: &'static [(&'static str, &'static str, &'static str)],
}

const POLICIES: &[StubPolicy] = &[
    StubPolicy {
        sg_id: "20240410",
        party: "더불어민주당",
        items: &[
            ("민생", "기본사회 추진", "기본소득·기본주거·기본금융으로 기본사회를 추진합니다."),
            ("경제", "소상공인 지원", "소상공인 대출 이자 부담을 경감합니다."),
        ],
    },
    StubPolicy {
        sg_id: "20240410",
        party: "국민의힘",
        items: &[
            ("민생", "민생경제 회복", "물가 안정과 민생경제 회복에 집중합니다."),
            ("안보", "튼튼한 안보", "한미동맹 기반의 안보체계를 강화합니다."),
        ],
    },
    StubPolicy {
        sg_id: "20240410",
        party: "정의당",
        items: &[
            ("노동", "노동권 보장", "모든 일하는 사람의 노동권을 보장합니다."),
            ("기후", "정의로운 전환", "기후위기 대응과 정의로운 산업 전환을 추진합니다."),
        ],
    },
    StubPolicy {
        sg_id: "20220309",
        party: "더불어민주당",
        items: &[
            ("경제", "전환적 공정성장", "디지털 대전환으로 성장 동력을 확보합니다."),
            ("주거", "주택 311만호", "임기 내 주택 311만호를 공급합니다."),
        ],
    },
    StubPolicy {
        sg_id: "20220309",
        party: "국민의힘",
        items: &[
            ("부동산", "부동산 정상화", "세제 개편과 공급 확대로 시장을 정상화합니다."),
            ("일자리", "민간주도 일자리", "민간 주도의 지속가능한 일자리를 창출합니다."),
        ],
    },
    StubPolicy {
        sg_id: "20220309",
        party: "정의당",
        items: &[
            ("복지", "시민최저선 보장", "주4일제와 신복지제도로 시민최저선을 보장합니다."),
            ("기후", "기후정의", "정의로운 녹색전환을 추진합니다."),
        ],
    },
];

struct StubWinner {
    candidate_id: &'static str,
    votes: u64,
    rate: f64,
}

const WINNERS: &[StubWinner] = &[
    StubWinner {
        candidate_id: "100089895",
        votes: 16_394_815,
        rate: 48.56,
    },
    StubWinner {
        candidate_id: "100158001",
        votes: 2_608_277,
        rate: 59.05,
    },
    StubWinner {
        candidate_id: "100158101",
        votes: 2_827_593,
        rate: 49.06,
    },
    StubWinner {
        candidate_id: "100200001",
        votes: 53_179,
        rate: 50.92,
    },
];

struct StubTurnout {
    sg_id: &'static str,
    typecode: &'static str,
    sido: &'static str,
    electors: u64,
    votes: u64,
}

const TURNOUT: &[StubTurnout] = &[
    StubTurnout {
        sg_id: "20240410",
        typecode: "2",
        sido: "전국",
        electors: 44_280_011,
        votes: 29_654_450,
    },
    StubTurnout {
        sg_id: "20240410",
        typecode: "2",
        sido: "서울특별시",
        electors: 8_316_380,
        votes: 5_778_846,
    },
    StubTurnout {
        sg_id: "20240410",
        typecode: "2",
        sido: "부산광역시",
        electors: 2_884_877,
        votes: 1_952_412,
    },
    StubTurnout {
        sg_id: "20220309",
        typecode: "1",
        sido: "전국",
        electors: 44_197_692,
        votes: 34_067_853,
    },
    StubTurnout {
        sg_id: "20220309",
        typecode: "1",
        sido: "서울특별시",
        electors: 8_346_647,
        votes: 6_502_820,
    },
];

/// Canned payload for one request, wrapped in the standard envelope.
pub fn payload_for(request: &ApiRequest) -> Value {
    let sg_id = request.get_param("sgId").unwrap_or("");
    let typecode = request.get_param("sgTypecode");
    let rows = match request.source {
        SourceId::Candidate => candidate_rows(sg_id, typecode),
        SourceId::Pledge => pledge_rows(sg_id, request.get_param("cnddtId")),
        SourceId::PartyPolicy => policy_rows(sg_id, request.get_param("partyName")),
        SourceId::Winner => winner_rows(sg_id, typecode),
        SourceId::Stats => turnout_rows(sg_id),
    };
    envelope(rows)
}

fn envelope(rows: Vec<Value>) -> Value {
    if rows.is_empty() {
        return json!({
            "response": {
                "header": {"resultCode": "INFO-03", "resultMsg": "NODATA_ERROR"},
                "body": {"items": "", "totalCount": 0}
            }
        });
    }
    // A single row ships as a lone object, matching the live quirk.
    let total = rows.len();
    let item = if total == 1 {
        rows.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(rows)
    };
    json!({
        "response": {
            "header": {"resultCode": "INFO-00", "resultMsg": "NORMAL SERVICE"},
            "body": {"items": {"item": item}, "totalCount": total}
        }
    })
}

fn candidate_rows(sg_id: &str, typecode: Option<&str>) -> Vec<Value> {
    CANDIDATES
        .iter()
        .filter(|c| c.sg_id == sg_id)
        .filter(|c| typecode.map_or(true, |t| c.typecode == t))
        .map(|c| {
            json!({
                "huboid": c.id,
                "sgId": c.sg_id,
                "sgTypecode": c.typecode,
                "sggName": c.sgg,
                "sdName": c.sido,
                "wiwName": c.gugun,
                "giho": c.giho,
                "jdName": c.party,
                "name": c.name,
                "hanjaName": c.hanja,
                "gender": c.gender,
                "birthday": c.birthday,
                "age": c.age,
                "job": c.job,
                "status": "등록",
            })
        })
        .collect()
}

fn pledge_rows(sg_id: &str, cnddt_id: Option<&str>) -> Vec<Value> {
    PLEDGES
        .iter()
        .filter(|p| cnddt_id.map_or(true, |id| p.candidate_id == id))
        .filter_map(|p| {
            let candidate = CANDIDATES.iter().find(|c| c.id == p.candidate_id)?;
            if !sg_id.is_empty() && candidate.sg_id != sg_id {
                return None;
            }
            let mut row = json!({
                "sgId": candidate.sg_id,
                "sgTypecode": candidate.typecode,
                "cnddtId": candidate.id,
                "krName": candidate.name,
                "jdName": candidate.party,
                "prmsCnt": p.items.len(),
            });
            append_numbered(&mut row, p.items);
            Some(row)
        })
        .collect()
}

fn policy_rows(sg_id: &str, party: Option<&str>) -> Vec<Value> {
    POLICIES
        .iter()
        .filter(|p| p.sg_id == sg_id)
        .filter(|p| party.map_or(true, |name| p.party == name))
        .map(|p| {
            let mut row = json!({
                "sgId": p.sg_id,
                "partyName": p.party,
                "prmsCnt": p.items.len(),
            });
            append_numbered(&mut row, p.items);
            row
        })
        .collect()
}

fn winner_rows(sg_id: &str, typecode: Option<&str>) -> Vec<Value> {
    WINNERS
        .iter()
        .filter_map(|w| {
            let candidate = CANDIDATES.iter().find(|c| c.id == w.candidate_id)?;
            if candidate.sg_id != sg_id {
                return None;
            }
            if let Some(t) = typecode {
                if candidate.typecode != t {
                    return None;
                }
            }
            Some(json!({
                "huboid": candidate.id,
                "sgId": candidate.sg_id,
                "sgTypecode": candidate.typecode,
                "sggName": candidate.sgg,
                "sdName": candidate.sido,
                "wiwName": candidate.gugun,
                "giho": candidate.giho,
                "jdName": candidate.party,
                "name": candidate.name,
                "dugsu": w.votes,
                "dugyul": w.rate,
            }))
        })
        .collect()
}

fn turnout_rows(sg_id: &str) -> Vec<Value> {
    TURNOUT
        .iter()
        .filter(|t| t.sg_id == sg_id)
        .map(|t| {
            json!({
                "sgId": t.sg_id,
                "sgTypecode": t.typecode,
                "sdName": t.sido,
                "sunCnt": t.electors,
                "tuCnt": t.votes,
            })
        })
        .collect()
}

fn append_numbered(row: &mut Value, items: &[(&str, &str, &str)]) {
    if let Some(obj) = row.as_object_mut() {
        for (n, (realm, title, cont)) in items.iter().enumerate().take(10) {
            let n = n + 1;
            obj.insert(format!("prmsRealmName{n}"), json!(realm));
            obj.insert(format!("prmsTitle{n}"), json!(title));
            obj.insert(format!("prmsCont{n}"), json!(cont));
        }
    }
}
