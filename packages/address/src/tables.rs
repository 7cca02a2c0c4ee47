//! Lookup tables embedded from `data/`.
//!
//! Every table is a TOML asset compiled into the binary with
//! `include_str!` and parsed once on first use. A malformed asset is a
//! build defect, so parsing panics with the asset name instead of
//! returning an error.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category of a recognised entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// Well-known landmarks and neighbourhoods.
    Landmark,
    /// Railway, metro and high-speed rail stations, airports.
    Transportation,
    /// Universities and high schools.
    Education,
    /// Hospitals and clinics.
    Medical,
    /// Shopping districts, department stores, night markets.
    Commercial,
    /// Scenic spots and museums.
    Tourism,
    /// Government offices.
    Government,
}

/// One category of `entities.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityCategory {
    /// Category kind.
    pub kind: EntityKind,
    /// Prior confidence that an address mentioning this category is
    /// geocodable.
    pub confidence: f64,
    /// Whether keys also match their `站` / no-`站` spellings.
    #[serde(default)]
    pub station_aliases: bool,
    /// Keywords that mark an address as belonging to this category even
    /// when no entry matched.
    #[serde(default)]
    pub generic_keywords: Vec<String>,
    /// Known entities, checked in order.
    #[serde(default)]
    pub entries: Vec<EntityEntry>,
}

/// A known entity and the query strings that locate it.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityEntry {
    /// Substring that identifies the entity in an address.
    pub key: String,
    /// Canonical names and the official address.
    pub variants: Vec<String>,
}

impl EntityEntry {
    /// Whether `text` mentions this entry, optionally accepting the
    /// station spellings of its key.
    #[must_use]
    pub fn matches(&self, text: &str, station_aliases: bool) -> bool {
        if text.contains(&self.key) {
            return true;
        }
        if !station_aliases {
            return false;
        }

        let short_station = self.key.replacen("車站", "站", 1);
        let bare = self.key.replacen('站', "", 1);
        (!short_station.is_empty() && text.contains(&short_station))
            || (!bare.is_empty() && text.contains(&bare))
    }
}

/// An abbreviation and its full forms.
#[derive(Debug, Clone, Deserialize)]
pub struct Abbreviation {
    /// Abbreviated spelling.
    pub short: String,
    /// Every full form the abbreviation may stand for.
    pub full: Vec<String>,
}

/// An English term and its local equivalent.
#[derive(Debug, Clone, Deserialize)]
pub struct EnglishTerm {
    /// Lowercase English spelling.
    pub english: String,
    /// Local spelling.
    pub local: String,
}

/// Per-field English renderings.
#[derive(Debug, Clone, Deserialize)]
pub struct Translations {
    /// City / county names.
    pub cities: BTreeMap<String, String>,
    /// District names.
    pub districts: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct EntityFile {
    categories: Vec<EntityCategory>,
}

#[derive(Deserialize)]
struct AbbreviationFile {
    abbreviations: Vec<Abbreviation>,
}

#[derive(Deserialize)]
struct EnglishFile {
    terms: Vec<EnglishTerm>,
}

static ENTITIES: LazyLock<Vec<EntityCategory>> = LazyLock::new(|| {
    parse_asset::<EntityFile>("entities", include_str!("../data/entities.toml")).categories
});

static ABBREVIATIONS: LazyLock<Vec<Abbreviation>> = LazyLock::new(|| {
    parse_asset::<AbbreviationFile>("abbreviations", include_str!("../data/abbreviations.toml"))
        .abbreviations
});

static ENGLISH_TERMS: LazyLock<Vec<EnglishTerm>> = LazyLock::new(|| {
    let mut terms =
        parse_asset::<EnglishFile>("english", include_str!("../data/english.toml")).terms;
    // Longest first so "new taipei" is replaced before "taipei".
    terms.sort_by_key(|t| std::cmp::Reverse(t.english.chars().count()));
    terms
});

static TRANSLATIONS: LazyLock<Translations> = LazyLock::new(|| {
    parse_asset::<Translations>("translations", include_str!("../data/translations.toml"))
});

fn parse_asset<T: serde::de::DeserializeOwned>(name: &str, contents: &str) -> T {
    toml::de::from_str(contents)
        .unwrap_or_else(|e| panic!("Failed to parse address table '{name}': {e}"))
}

/// Entity categories in lookup order.
#[must_use]
pub fn entity_categories() -> &'static [EntityCategory] {
    &ENTITIES
}

/// Abbreviation table in declaration order.
#[must_use]
pub fn abbreviations() -> &'static [Abbreviation] {
    &ABBREVIATIONS
}

/// English terms, longest first.
#[must_use]
pub fn english_terms() -> &'static [EnglishTerm] {
    &ENGLISH_TERMS
}

/// English rendering of a city, e.g. `新北市` → `New Taipei City`.
#[must_use]
pub fn city_english(city: &str) -> Option<&'static str> {
    TRANSLATIONS.cities.get(city).map(String::as_str)
}

/// English rendering of a district, e.g. `新店區` → `Xindian District`.
#[must_use]
pub fn district_english(district: &str) -> Option<&'static str> {
    TRANSLATIONS.districts.get(district).map(String::as_str)
}
