use crate::error::JoinKeyError;
use crate::types::{AggregateRecord, ChoroplethRecord, ZoneRecord};
use std::collections::HashMap;

/// Comparison form of a zone key: whitespace removed, ASCII upper-cased.
/// `"sw1a 1aa"` and `"SW1A1AA"` normalize to the same key.
pub fn normalize_zone_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Attach zone geometry to each aggregate row.
///
/// Inner merge on the normalized zone key. Zones without aggregates are left
/// out, and a zone with counts in several categories appears once per
/// category. Output follows the order of `aggregates`.
pub fn assemble(zones: &[ZoneRecord], aggregates: &[AggregateRecord]) -> Result<Vec<ChoroplethRecord>, JoinKeyError> {
    let mut by_key: HashMap<String, &ZoneRecord> = HashMap::with_capacity(zones.len());
    for zone in zones {
        let normalized = normalize_zone_key(&zone.zone_key);
        if normalized.is_empty() {
            return Err(JoinKeyError::EmptyKey(zone.zone_key.clone()));
        }
        if let Some(existing) = by_key.insert(normalized.clone(), zone) {
            return Err(JoinKeyError::DuplicateZone {
                first: existing.zone_key.clone(),
                second: zone.zone_key.clone(),
                normalized,
            });
        }
    }

    aggregates
        .iter()
        .map(|agg| {
            let normalized = normalize_zone_key(&agg.zone_key);
            if normalized.is_empty() {
                return Err(JoinKeyError::EmptyKey(agg.zone_key.clone()));
            }
            let zone = by_key
                .get(&normalized)
                .ok_or_else(|| JoinKeyError::UnmatchedKey(agg.zone_key.clone()))?;
            Ok(ChoroplethRecord {
                zone_key: zone.zone_key.clone(),
                geometry: zone.geometry.clone(),
                category: agg.category.clone(),
                count: agg.count,
            })
        })
        .collect()
}
