//! Query-variant generation.
//!
//! Turns one address into an ordered list of query strings at decreasing
//! specificity. Index 0 is the most specific variant; callers query in
//! order and stop early once a variant resolves well enough.
//!
//! Stages, each appending candidates:
//!
//! 1. Known-entity lookup (landmarks, stations, schools, ...).
//! 2. Abbreviation expansion (`北市` → `台北市`).
//! 3. English term normalization (`taipei` → `台北`).
//! 4. The address itself and its structural levels (road, district, city,
//!    with English renderings).
//! 5. Country-prefixed forms.
//! 6. Neighbouring alleys and "near this road" queries.
//!
//! The result is deduplicated in first-seen order and capped.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::parser::{self, AddressStructure};
use crate::tables::{self, EntityKind};

/// Default cap on the number of variants.
pub const DEFAULT_MAX_VARIANTS: usize = 15;

const COUNTRY_PREFIXES: [&str; 3] = ["Taiwan ", "台灣 ", "Taiwan, "];

const ADMINISTRATIVE_SUFFIXES: [char; 5] = ['區', '市', '鎮', '鄉', '縣'];

/// An entity recognised in the address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedEntity {
    /// Category of the entity.
    pub kind: EntityKind,
    /// The table key that matched, or `None` for a generic keyword match.
    pub key: Option<String>,
    /// Prior confidence of the category.
    pub confidence: f64,
}

/// Output of [`generate`].
#[derive(Debug, Clone, Serialize)]
pub struct VariantSet {
    /// Structure the variants were derived from.
    pub structure: AddressStructure,
    /// Query strings, most specific first.
    pub variants: Vec<String>,
    /// First recognised entity, if any.
    pub entity: Option<RecognizedEntity>,
}

/// Generates up to `max_variants` query strings for `address`.
///
/// Deterministic: the same input always yields the same list.
#[must_use]
pub fn generate(address: &str, max_variants: usize) -> VariantSet {
    let address = address.trim();
    let raw = parser::parse(address);

    // A structurally parsed address only searches the part the hierarchy
    // did not consume, so district and road names never count as landmarks.
    let scope = if raw.is_detailed {
        raw.building_name.clone()
    } else {
        Some(address.to_string())
    };

    let mut variants = Vec::new();

    let entity = scope
        .as_deref()
        .and_then(|scope| entity_variants(address, scope, &mut variants));

    let expanded = scope
        .as_deref()
        .map(|scope| expand_abbreviations(address, scope))
        .unwrap_or_default();
    variants.extend(expanded.iter().cloned());

    let normalized = normalize_english(address);
    if let Some(normalized) = &normalized {
        variants.push(normalized.clone());
        variants.push(format!("{normalized} 台灣"));
        variants.push(format!("Taiwan {normalized}"));
    }

    let structure = if raw.is_detailed {
        raw
    } else {
        expanded
            .iter()
            .chain(normalized.iter())
            .map(|candidate| parser::parse(candidate))
            .find(|s| s.is_detailed)
            .unwrap_or(raw)
    };

    variants.push(address.to_string());
    structural_variants(&structure, &mut variants);

    for prefix in COUNTRY_PREFIXES {
        variants.push(format!("{prefix}{address}"));
        if let Some(road) = &structure.road_level {
            variants.push(format!("{prefix}{road}"));
        }
        if let Some(district) = &structure.district_level {
            variants.push(format!("{prefix}{district}"));
        }
    }

    fuzzy_variants(&structure, &mut variants);

    let mut variants = dedupe(variants);
    variants.truncate(max_variants);

    log::debug!(
        "generated {} variants for {address:?}: {variants:?}",
        variants.len()
    );

    VariantSet {
        structure,
        variants,
        entity,
    }
}

/// Removes blanks and repeats, keeping first-seen order.
#[must_use]
pub fn dedupe(variants: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    variants
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

fn entity_variants(
    address: &str,
    scope: &str,
    out: &mut Vec<String>,
) -> Option<RecognizedEntity> {
    let mut recognized = None;

    for category in tables::entity_categories() {
        let hit = category
            .entries
            .iter()
            .find(|entry| entry.matches(scope, category.station_aliases));

        let entity = if let Some(entry) = hit {
            out.extend(entry.variants.iter().cloned());
            RecognizedEntity {
                kind: category.kind,
                key: Some(entry.key.clone()),
                confidence: category.confidence,
            }
        } else if category
            .generic_keywords
            .iter()
            .any(|keyword| scope.contains(keyword.as_str()))
        {
            out.push(address.to_string());
            out.push(format!("{address} 台灣"));
            out.push(format!("Taiwan {address}"));
            RecognizedEntity {
                kind: category.kind,
                key: None,
                confidence: category.confidence,
            }
        } else {
            continue;
        };

        log::debug!("recognised {entity:?} in {address:?}");
        if recognized.is_none() {
            recognized = Some(entity);
        }
    }

    recognized
}

fn expand_abbreviations(address: &str, scope: &str) -> Vec<String> {
    let mut out = Vec::new();

    for abbreviation in tables::abbreviations() {
        if !scope.contains(abbreviation.short.as_str()) {
            continue;
        }
        if abbreviation
            .full
            .iter()
            .any(|full| address.contains(full.as_str()))
        {
            continue;
        }
        let short = abbreviation.short.as_str();
        let Some(at) = standalone_match(address, short) else {
            continue;
        };
        let (head, tail) = (&address[..at], &address[at + short.len()..]);
        out.extend(abbreviation.full.iter().map(|full| format!("{head}{full}{tail}")));
    }

    out
}

/// Byte offset of the first `short` in `address` that does not open an
/// administrative name, so `信義` in `信義區` is left alone.
fn standalone_match(address: &str, short: &str) -> Option<usize> {
    address
        .match_indices(short)
        .map(|(at, _)| at)
        .find(|&at| !address[at + short.len()..].starts_with(ADMINISTRATIVE_SUFFIXES))
}

/// Lowercases and substitutes known English terms. `None` when the
/// address contains none of them.
fn normalize_english(address: &str) -> Option<String> {
    let mut processed = address.to_lowercase();
    let mut changed = false;

    for term in tables::english_terms() {
        if processed.contains(term.english.as_str()) {
            processed = processed.replace(term.english.as_str(), &term.local);
            changed = true;
        }
    }

    changed.then_some(processed)
}

fn structural_variants(structure: &AddressStructure, out: &mut Vec<String>) {
    if !structure.is_detailed {
        return;
    }

    out.push(structure.original.clone());

    let levels = [
        &structure.without_house_number,
        &structure.without_alley,
        &structure.road_level,
        &structure.road_level_english,
        &structure.district_level,
        &structure.district_level_english,
        &structure.city_level,
        &structure.city_level_english,
    ];
    out.extend(levels.into_iter().flatten().cloned());
}

fn fuzzy_variants(structure: &AddressStructure, out: &mut Vec<String>) {
    if !structure.is_detailed {
        return;
    }
    let Some(road) = &structure.road_level else {
        return;
    };

    if let Some(alley) = structure.alley_value() {
        for offset in [-2_i64, -1, 1, 2] {
            let nearby = i64::from(alley) + offset;
            if nearby > 0 {
                out.push(format!("{road}{nearby}巷"));
            }
        }
    }

    out.push(format!("{road} 附近"));
    out.push(format!("{road} 周邊"));
}
