//! Static almanac of the elections the upstream services cover.
//!
//! Election ids (`sgId`) are the election day as `YYYYMMDD`. The table is
//! ordered oldest to newest so "latest" lookups scan from the back. Every
//! inference rule that fills a missing election id resolves against this
//! table, never against free-form text.

/// Election type codes as the upstream wire defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElectionType {
    /// 대통령선거
    President,
    /// 국회의원선거
    NationalAssembly,
    /// 시·도지사선거
    MetroChief,
    /// 구·시·군의 장선거
    LocalChief,
    /// 시·도의회의원선거
    MetroCouncil,
    /// 구·시·군의회의원선거
    LocalCouncil,
    /// 교육감선거
    Superintendent,
}

impl ElectionType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::President => "1",
            Self::NationalAssembly => "2",
            Self::MetroChief => "3",
            Self::LocalChief => "4",
            Self::MetroCouncil => "5",
            Self::LocalCouncil => "6",
            Self::Superintendent => "8",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::President),
            "2" => Some(Self::NationalAssembly),
            "3" => Some(Self::MetroChief),
            "4" => Some(Self::LocalChief),
            "5" => Some(Self::MetroCouncil),
            "6" => Some(Self::LocalCouncil),
            "8" => Some(Self::Superintendent),
            _ => None,
        }
    }

    /// Resolve a position keyword from question text to a type code.
    /// Longer, more specific keywords are listed before short ones so
    /// "시도지사" never falls through to the bare "시장" match.
    pub fn from_keyword(text: &str) -> Option<Self> {
        const KEYWORDS: &[(&str, ElectionType)] = &[
            ("대통령", ElectionType::President),
            ("대선", ElectionType::President),
            ("국회의원", ElectionType::NationalAssembly),
            ("총선", ElectionType::NationalAssembly),
            ("교육감", ElectionType::Superintendent),
            ("시도지사", ElectionType::MetroChief),
            ("도지사", ElectionType::MetroChief),
            ("시장", ElectionType::MetroChief),
            ("구청장", ElectionType::LocalChief),
            ("군수", ElectionType::LocalChief),
            ("광역의원", ElectionType::MetroCouncil),
            ("시도의원", ElectionType::MetroCouncil),
            ("기초의원", ElectionType::LocalCouncil),
            ("구시군의원", ElectionType::LocalCouncil),
        ];
        KEYWORDS
            .iter()
            .find(|(kw, _)| text.contains(kw))
            .map(|(_, t)| *t)
    }
}

/// One election day. Nationwide local elections hold several races at once,
/// so `types` can carry more than one code; the first entry is the race a
/// bare "지방선거" question is taken to mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Election {
    pub sg_id: &'static str,
    pub year: i32,
    pub date: &'static str,
    pub name: &'static str,
    pub types: &'static [ElectionType],
}

impl Election {
    pub fn primary_type(&self) -> ElectionType {
        self.types[0]
    }

    pub fn holds(&self, t: ElectionType) -> bool {
        self.types.contains(&t)
    }
}

const LOCAL_RACES: &[ElectionType] = &[
    ElectionType::MetroChief,
    ElectionType::LocalChief,
    ElectionType::MetroCouncil,
    ElectionType::LocalCouncil,
    ElectionType::Superintendent,
];

/// Supported elections, oldest first.
pub const ELECTIONS: &[Election] = &[
    Election {
        sg_id: "20170509",
        year: 2017,
        date: "2017-05-09",
        name: "제19대 대통령선거",
        types: &[ElectionType::President],
    },
    Election {
        sg_id: "20180613",
        year: 2018,
        date: "2018-06-13",
        name: "제7회 전국동시지방선거",
        types: LOCAL_RACES,
    },
    Election {
        sg_id: "20200415",
        year: 2020,
        date: "2020-04-15",
        name: "제21대 국회의원선거",
        types: &[ElectionType::NationalAssembly],
    },
    Election {
        sg_id: "20220309",
        year: 2022,
        date: "2022-03-09",
        name: "제20대 대통령선거",
        types: &[ElectionType::President],
    },
    Election {
        sg_id: "20220601",
        year: 2022,
        date: "2022-06-01",
        name: "제8회 전국동시지방선거",
        types: LOCAL_RACES,
    },
    Election {
        sg_id: "20240410",
        year: 2024,
        date: "2024-04-10",
        name: "제22대 국회의원선거",
        types: &[ElectionType::NationalAssembly],
    },
];

/// Election id used when nothing in the question narrows it down.
pub const DEFAULT_SG_ID: &str = "20240410";

/// Public figures whose names alone pin down an election. Checked before
/// any year/type inference so "윤석열 공약" lands on the right race without
/// the user naming it.
pub const KNOWN_FIGURES: &[(&str, &str)] = &[
    ("문재인", "20170509"),
    ("홍준표", "20170509"),
    ("윤석열", "20220309"),
    ("이재명", "20220309"),
    ("심상정", "20220309"),
    ("안철수", "20220309"),
    ("오세훈", "20220601"),
    ("김동연", "20220601"),
];

/// Parties queried when a party-level question names none.
pub const MAJOR_PARTIES: &[&str] = &["더불어민주당", "국민의힘", "정의당"];

/// Party names recognized in free text, in precedence order.
pub const KNOWN_PARTIES: &[&str] = &[
    "더불어민주당",
    "조국혁신당",
    "기본소득당",
    "개혁신당",
    "국민의힘",
    "국민의당",
    "진보당",
    "정의당",
    "녹색당",
];

/// All party names found in the text, in table order.
pub fn parties_in_text(text: &str) -> Vec<&'static str> {
    KNOWN_PARTIES
        .iter()
        .filter(|p| text.contains(*p))
        .copied()
        .collect()
}

pub fn latest() -> &'static Election {
    &ELECTIONS[ELECTIONS.len() - 1]
}

pub fn latest_of_type(t: ElectionType) -> Option<&'static Election> {
    ELECTIONS.iter().rev().find(|e| e.holds(t))
}

pub fn by_sg_id(sg_id: &str) -> Option<&'static Election> {
    ELECTIONS.iter().find(|e| e.sg_id == sg_id)
}

pub fn by_year(year: i32) -> Option<&'static Election> {
    ELECTIONS.iter().rev().find(|e| e.year == year)
}

pub fn by_year_and_type(year: i32, t: ElectionType) -> Option<&'static Election> {
    ELECTIONS
        .iter()
        .rev()
        .find(|e| e.year == year && e.holds(t))
}

/// Scan question text for a known figure; returns `(name, sg_id)`.
pub fn figure_in_text(text: &str) -> Option<(&'static str, &'static str)> {
    KNOWN_FIGURES
        .iter()
        .find(|(name, _)| text.contains(name))
        .copied()
}
