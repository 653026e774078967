//! Fixed gazetteer of Korean administrative regions.
//!
//! The upstream services want full 시·도 names ("서울특별시"), while
//! questions use the short forms. Detection is a plain table scan; no
//! morphological analysis is attempted.

use crate::types::Region;

/// 17 시·도: full upstream name, longer aliases first, bare short form last.
/// Detection reports the short form; `canonical_sido` expands any form back
/// to the full name the services expect.
const SIDO: &[(&str, &[&str])] = &[
    ("서울특별시", &["서울시", "서울"]),
    ("부산광역시", &["부산시", "부산"]),
    ("대구광역시", &["대구시", "대구"]),
    ("인천광역시", &["인천시", "인천"]),
    ("광주광역시", &["광주시", "광주"]),
    ("대전광역시", &["대전시", "대전"]),
    ("울산광역시", &["울산시", "울산"]),
    ("세종특별자치시", &["세종시", "세종"]),
    ("경기도", &["경기"]),
    ("강원특별자치도", &["강원도", "강원"]),
    ("충청북도", &["충북"]),
    ("충청남도", &["충남"]),
    ("전북특별자치도", &["전라북도", "전북"]),
    ("전라남도", &["전남"]),
    ("경상북도", &["경북"]),
    ("경상남도", &["경남"]),
    ("제주특별자치도", &["제주도", "제주"]),
];

fn short_form(full: &str, aliases: &[&str]) -> String {
    aliases.last().copied().unwrap_or(full).to_string()
}

/// Well-known districts mapped to their parent 시·도.
const DISTRICTS: &[(&str, &str)] = &[
    ("종로구", "서울특별시"),
    ("중구", "서울특별시"),
    ("용산구", "서울특별시"),
    ("성동구", "서울특별시"),
    ("광진구", "서울특별시"),
    ("동대문구", "서울특별시"),
    ("마포구", "서울특별시"),
    ("양천구", "서울특별시"),
    ("강서구", "서울특별시"),
    ("구로구", "서울특별시"),
    ("영등포구", "서울특별시"),
    ("동작구", "서울특별시"),
    ("관악구", "서울특별시"),
    ("서초구", "서울특별시"),
    ("강남구", "서울특별시"),
    ("송파구", "서울특별시"),
    ("강동구", "서울특별시"),
    ("노원구", "서울특별시"),
    ("은평구", "서울특별시"),
    ("해운대구", "부산광역시"),
    ("수영구", "부산광역시"),
    ("수원시", "경기도"),
    ("성남시", "경기도"),
    ("고양시", "경기도"),
    ("용인시", "경기도"),
    ("부천시", "경기도"),
    ("안산시", "경기도"),
    ("안양시", "경기도"),
    ("청주시", "충청북도"),
    ("전주시", "전북특별자치도"),
    ("포항시", "경상북도"),
    ("창원시", "경상남도"),
];

/// Canonical full 시·도 name; unknown inputs pass through unchanged.
pub fn canonical_sido(input: &str) -> String {
    let trimmed = input.trim();
    for (full, aliases) in SIDO {
        if trimmed == *full || aliases.contains(&trimmed) {
            return (*full).to_string();
        }
    }
    trimmed.to_string()
}

/// First region mentioned in the text, reported with the short 시·도 form.
/// A district hit without a 시·도 hit resolves the parent from the district
/// table.
pub fn find_region(text: &str) -> Option<Region> {
    let district = DISTRICTS
        .iter()
        .find(|(name, _)| text.contains(name))
        .copied();

    // 시·도 aliases are scanned with the district hit blanked out, so
    // "대구" inside "해운대구" is not taken for a 시·도 mention.
    let scan = match district {
        Some((name, _)) => text.replace(name, " "),
        None => text.to_string(),
    };
    let sido = SIDO.iter().find_map(|(full, aliases)| {
        if scan.contains(full) || aliases.iter().any(|a| scan.contains(a)) {
            Some(short_form(full, aliases))
        } else {
            None
        }
    });

    match (sido, district) {
        (Some(sido), Some((district, _))) => Some(Region {
            sido,
            sigungu: Some(district.to_string()),
        }),
        (Some(sido), None) => Some(Region {
            sido,
            sigungu: None,
        }),
        (None, Some((district, parent))) => {
            let sido = SIDO
                .iter()
                .find(|(full, _)| full == &parent)
                .map(|(full, aliases)| short_form(full, aliases))
                .unwrap_or_else(|| parent.to_string());
            Some(Region {
                sido,
                sigungu: Some(district.to_string()),
            })
        }
        (None, None) => None,
    }
}

/// Whether a token names a region (used to keep region words out of
/// candidate-name extraction).
pub fn is_region_token(token: &str) -> bool {
    let trimmed = token.trim();
    SIDO.iter()
        .any(|(full, aliases)| trimmed == *full || aliases.contains(&trimmed))
        || DISTRICTS.iter().any(|(name, _)| trimmed == *name)
}
