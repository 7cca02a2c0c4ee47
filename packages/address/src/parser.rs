//! Structural parsing of Taiwanese addresses.
//!
//! Splits an address such as `新北市新店區北宜路二段100號` into its region
//! hierarchy (city, district, road, section, alley, lane, house number and
//! an optional trailing building name) and derives progressively coarser
//! re-assemblies used as fallback queries.
//!
//! Parsing is best effort. An address that does not fit the hierarchy is
//! not an error: [`AddressStructure::is_detailed`] is simply `false`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::tables;

/// Top-level region names followed by 縣 or 市.
const CITY: &str = "(?P<city>(?:台北|臺北|新北|桃園|台中|臺中|台南|臺南|高雄|基隆|新竹|嘉義|苗栗|彰化|南投|雲林|屏東|宜蘭|花蓮|台東|臺東|澎湖|金門|連江)[縣市])";
const DISTRICT: &str = r"\s*(?P<district>[^縣市]+?[區市鎮鄉])";
const ROAD: &str = r"\s*(?P<road>[^區市鎮鄉]+?(?:大道|[路街道]))";
const SECTION: &str = r"\s*(?:(?P<section>[一二三四五六七八九十0-9]+)段)?";
const TAIL: &str = r"\s*(?:(?P<alley>[0-9]+)巷)?\s*(?:(?P<lane>[0-9]+)弄)?\s*(?:(?P<house>[0-9]+(?:-[0-9]+)?(?:號|之[0-9]+號?)?))?\s*(?:[,，]\s*)?(?P<building>[^,，\s][^,，]*?(?:大樓|大廈|廣場|中心|公寓|社區))?\s*$";

/// Full hierarchy with an explicit section segment, then the same without.
static PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(&format!("^{CITY}{DISTRICT}{ROAD}{SECTION}{TAIL}")).expect("valid regex"),
        Regex::new(&format!("^{CITY}{DISTRICT}{ROAD}{TAIL}")).expect("valid regex"),
    ]
});

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9]+").expect("valid regex"));

/// Which sub-street level an estimate for this address interpolates along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterpolationKind {
    /// House number inside a lane (弄).
    Lane,
    /// House number inside an alley (巷).
    Alley,
    /// House number directly on the road.
    Street,
    /// Alley or lane without a house number: the estimate sits at the
    /// alley mouth.
    AlleyBoundary,
}

/// A parsed address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressStructure {
    /// The input, verbatim.
    pub original: String,
    /// Whether the region hierarchy down to the road was extracted.
    pub is_detailed: bool,
    pub city: Option<String>,
    pub district: Option<String>,
    pub road: Option<String>,
    /// Section number as written (`二`, `2`).
    pub section: Option<String>,
    pub alley: Option<String>,
    pub lane: Option<String>,
    /// House number as written (`100號`, `12-3`, `5之1號`).
    pub house_number: Option<String>,
    pub building_name: Option<String>,
    /// City + district + road + section.
    pub road_level: Option<String>,
    /// City + district.
    pub district_level: Option<String>,
    /// City alone.
    pub city_level: Option<String>,
    /// Road level plus alley and lane; only set when either exists.
    pub without_house_number: Option<String>,
    /// Road level without any sub-street segment.
    pub without_alley: Option<String>,
    pub road_level_english: Option<String>,
    pub district_level_english: Option<String>,
    pub city_level_english: Option<String>,
}

impl AddressStructure {
    /// Sub-street level an estimate would interpolate along, if any.
    #[must_use]
    pub fn interpolation_kind(&self) -> Option<InterpolationKind> {
        if self.road.is_none() {
            return None;
        }
        match (&self.house_number, &self.alley, &self.lane) {
            (Some(_), _, Some(_)) => Some(InterpolationKind::Lane),
            (Some(_), Some(_), None) => Some(InterpolationKind::Alley),
            (Some(_), None, None) => Some(InterpolationKind::Street),
            (None, Some(_), _) | (None, None, Some(_)) => Some(InterpolationKind::AlleyBoundary),
            (None, None, None) => None,
        }
    }

    /// Leading integer of the house number (`5之1號` → 5).
    #[must_use]
    pub fn house_number_value(&self) -> Option<u32> {
        self.house_number.as_deref().and_then(leading_number)
    }

    /// Numeric alley value.
    #[must_use]
    pub fn alley_value(&self) -> Option<u32> {
        self.alley.as_deref().and_then(leading_number)
    }

    /// Numeric lane value.
    #[must_use]
    pub fn lane_value(&self) -> Option<u32> {
        self.lane.as_deref().and_then(leading_number)
    }

    /// Whether the address names a specific house.
    #[must_use]
    pub const fn has_house_number(&self) -> bool {
        self.house_number.is_some()
    }

    /// City + district + road without the section, used for road probes.
    #[must_use]
    pub fn road_without_section(&self) -> Option<String> {
        match (&self.city, &self.district, &self.road) {
            (Some(city), Some(district), Some(road)) => Some(format!("{city}{district}{road}")),
            _ => None,
        }
    }
}

/// Parses a free-text address into its structure.
///
/// The first of the two hierarchy patterns that matches wins. On no match
/// every hierarchy field is `None` and `is_detailed` is `false`.
#[must_use]
pub fn parse(address: &str) -> AddressStructure {
    let trimmed = address.trim();

    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(trimmed) {
            let structure = from_captures(address, &caps);
            log::debug!("parsed address {address:?} as {structure:?}");
            return structure;
        }
    }

    log::debug!("address {address:?} does not fit the region hierarchy");
    AddressStructure {
        original: address.to_string(),
        ..AddressStructure::default()
    }
}

fn from_captures(address: &str, caps: &Captures<'_>) -> AddressStructure {
    let group = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());

    let city = group("city");
    let district = group("district");
    let road = group("road");
    let section = group("section");
    let alley = group("alley");
    let lane = group("lane");
    let house_number = group("house");
    let building_name = group("building");

    let city_s = city.clone().unwrap_or_default();
    let district_s = district.clone().unwrap_or_default();
    let road_s = road.clone().unwrap_or_default();

    let mut road_level = format!("{city_s}{district_s}{road_s}");
    if let Some(section) = &section {
        road_level.push_str(section);
        road_level.push('段');
    }

    let without_house_number = if alley.is_some() || lane.is_some() {
        let mut s = road_level.clone();
        if let Some(alley) = &alley {
            s.push_str(alley);
            s.push('巷');
        }
        if let Some(lane) = &lane {
            s.push_str(lane);
            s.push('弄');
        }
        Some(s)
    } else {
        None
    };

    let city_level_english = tables::city_english(&city_s).map(|c| format!("{c}, Taiwan"));
    let district_level_english = city_level_english.as_ref().map(|city_en| {
        let district_en = tables::district_english(&district_s).unwrap_or(district_s.as_str());
        format!("{district_en}, {city_en}")
    });
    let road_level_english = Some(road_english(
        &road_s,
        section.as_deref(),
        district_level_english.as_deref(),
    ));

    AddressStructure {
        original: address.to_string(),
        is_detailed: true,
        district_level: Some(format!("{city_s}{district_s}")),
        city_level: city.clone(),
        without_alley: Some(road_level.clone()),
        road_level: Some(road_level),
        without_house_number,
        road_level_english,
        district_level_english,
        city_level_english,
        city,
        district,
        road,
        section,
        alley,
        lane,
        house_number,
        building_name,
    }
}

/// `北宜路` + `二` → `北宜 Road, Section 2, <district english>`.
fn road_english(road: &str, section: Option<&str>, district_english: Option<&str>) -> String {
    let (stem, suffix) = if let Some(stem) = road.strip_suffix("大道") {
        (stem, "Avenue")
    } else if let Some(stem) = road.strip_suffix('街') {
        (stem, "Street")
    } else if let Some(stem) = road
        .strip_suffix('路')
        .or_else(|| road.strip_suffix('道'))
    {
        (stem, "Road")
    } else {
        (road, "Road")
    };

    let mut out = format!("{stem} {suffix}");
    if let Some(section) = section {
        out.push_str(", Section ");
        match chinese_numeral(section) {
            Some(n) => out.push_str(&n.to_string()),
            None => out.push_str(section),
        }
    }
    match district_english {
        Some(rest) => {
            out.push_str(", ");
            out.push_str(rest);
        }
        None => out.push_str(", Taiwan"),
    }
    out
}

/// Converts `一`..`九十九` (or plain digits) into a number.
fn chinese_numeral(text: &str) -> Option<u32> {
    if let Ok(n) = text.parse::<u32>() {
        return Some(n);
    }

    let digit = |c: char| -> Option<u32> {
        Some(match c {
            '一' => 1,
            '二' => 2,
            '三' => 3,
            '四' => 4,
            '五' => 5,
            '六' => 6,
            '七' => 7,
            '八' => 8,
            '九' => 9,
            _ => return None,
        })
    };

    let chars: Vec<char> = text.chars().collect();
    match chars.as_slice() {
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', ones] => Some(10 + digit(*ones)?),
        [tens, '十'] => Some(digit(*tens)? * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        _ => None,
    }
}

fn leading_number(text: &str) -> Option<u32> {
    LEADING_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_address_with_section() {
        let s = parse("新北市新店區北宜路二段100號");
        assert!(s.is_detailed);
        assert_eq!(s.city.as_deref(), Some("新北市"));
        assert_eq!(s.district.as_deref(), Some("新店區"));
        assert_eq!(s.road.as_deref(), Some("北宜路"));
        assert_eq!(s.section.as_deref(), Some("二"));
        assert_eq!(s.house_number.as_deref(), Some("100號"));
        assert_eq!(s.road_level.as_deref(), Some("新北市新店區北宜路二段"));
        assert_eq!(s.district_level.as_deref(), Some("新北市新店區"));
        assert_eq!(s.city_level.as_deref(), Some("新北市"));
        assert_eq!(s.without_house_number, None);
        assert_eq!(s.house_number_value(), Some(100));
        assert_eq!(s.interpolation_kind(), Some(InterpolationKind::Street));
    }

    #[test]
    fn parses_alley_and_lane() {
        let s = parse("台北市大安區和平東路三段15巷7弄3號");
        assert!(s.is_detailed);
        assert_eq!(s.road.as_deref(), Some("和平東路"));
        assert_eq!(s.section.as_deref(), Some("三"));
        assert_eq!(s.alley.as_deref(), Some("15"));
        assert_eq!(s.lane.as_deref(), Some("7"));
        assert_eq!(s.house_number.as_deref(), Some("3號"));
        assert_eq!(
            s.without_house_number.as_deref(),
            Some("台北市大安區和平東路三段15巷7弄")
        );
        assert_eq!(s.without_alley.as_deref(), Some("台北市大安區和平東路三段"));
        assert_eq!(s.interpolation_kind(), Some(InterpolationKind::Lane));
        assert_eq!(s.alley_value(), Some(15));
        assert_eq!(s.lane_value(), Some(7));
    }

    #[test]
    fn parses_sub_numbers() {
        let s = parse("台中市西屯區台灣大道三段99-1號");
        assert_eq!(s.road.as_deref(), Some("台灣大道"));
        assert_eq!(s.house_number.as_deref(), Some("99-1號"));
        assert_eq!(s.house_number_value(), Some(99));

        let s = parse("高雄市前金區中正四路5之1號");
        assert_eq!(s.house_number.as_deref(), Some("5之1號"));
        assert_eq!(s.house_number_value(), Some(5));
    }

    #[test]
    fn parses_without_house_number() {
        let s = parse("台北市信義區松仁路");
        assert!(s.is_detailed);
        assert_eq!(s.house_number, None);
        assert_eq!(s.road_level.as_deref(), Some("台北市信義區松仁路"));
        assert_eq!(s.interpolation_kind(), None);
    }

    #[test]
    fn parses_trailing_building() {
        let s = parse("台北市信義區信義路五段7號台北101大樓");
        assert!(s.is_detailed);
        assert_eq!(s.house_number.as_deref(), Some("7號"));
        assert_eq!(s.building_name.as_deref(), Some("台北101大樓"));
    }

    #[test]
    fn alley_without_house_is_boundary() {
        let s = parse("新北市板橋區文化路一段25巷");
        assert_eq!(s.alley.as_deref(), Some("25"));
        assert_eq!(s.interpolation_kind(), Some(InterpolationKind::AlleyBoundary));
    }

    #[test]
    fn unparseable_address_is_not_detailed() {
        let s = parse("台北101");
        assert!(!s.is_detailed);
        assert_eq!(s.original, "台北101");
        assert_eq!(s.city, None);
        assert_eq!(s.road_level, None);
        assert_eq!(s.interpolation_kind(), None);
    }

    #[test]
    fn english_renderings() {
        let s = parse("新北市新店區北宜路二段100號");
        assert_eq!(s.city_level_english.as_deref(), Some("New Taipei City, Taiwan"));
        assert_eq!(
            s.district_level_english.as_deref(),
            Some("Xindian District, New Taipei City, Taiwan")
        );
        assert_eq!(
            s.road_level_english.as_deref(),
            Some("北宜 Road, Section 2, Xindian District, New Taipei City, Taiwan")
        );
    }

    #[test]
    fn unknown_city_has_no_english_levels() {
        let s = parse("花蓮縣吉安鄉中央路10號");
        assert!(s.is_detailed);
        assert_eq!(s.city_level_english, None);
        assert_eq!(s.district_level_english, None);
        assert_eq!(s.road_level_english.as_deref(), Some("中央 Road, Taiwan"));
    }

    #[test]
    fn chinese_numerals() {
        assert_eq!(chinese_numeral("二"), Some(2));
        assert_eq!(chinese_numeral("十"), Some(10));
        assert_eq!(chinese_numeral("十二"), Some(12));
        assert_eq!(chinese_numeral("二十三"), Some(23));
        assert_eq!(chinese_numeral("5"), Some(5));
    }
}
