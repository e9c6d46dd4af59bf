use crate::types::{AggregateRecord, JoinPair};
use std::collections::HashMap;

/// Count pairs per (category, zone key).
///
/// Output is ordered by count descending, then category, then zone key, so
/// any permutation of the same pairs gives the same result.
pub fn aggregate(pairs: &[JoinPair]) -> Vec<AggregateRecord> {
    let mut counts: HashMap<(&str, &str), u32> = HashMap::new();
    for pair in pairs {
        *counts
            .entry((pair.category.as_str(), pair.zone_key.as_str()))
            .or_insert(0) += 1;
    }

    let mut records: Vec<AggregateRecord> = counts
        .into_iter()
        .map(|((category, zone_key), count)| AggregateRecord {
            category: category.to_string(),
            zone_key: zone_key.to_string(),
            count,
        })
        .collect();

    records.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.zone_key.cmp(&b.zone_key))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(place: usize, category: &str, zone_key: &str) -> JoinPair {
        JoinPair {
            place,
            zone: 0,
            category: category.to_string(),
            zone_key: zone_key.to_string(),
        }
    }

    fn rows(records: &[AggregateRecord]) -> Vec<(&str, &str, u32)> {
        records
            .iter()
            .map(|r| (r.category.as_str(), r.zone_key.as_str(), r.count))
            .collect()
    }

    #[test]
    fn test_scenario_tie_break() {
        let pairs = vec![pair(0, "Cafe", "Z1"), pair(1, "Pub", "Z1"), pair(2, "Cafe", "Z2")];

        assert_eq!(
            rows(&aggregate(&pairs)),
            vec![("Cafe", "Z1", 1), ("Cafe", "Z2", 1), ("Pub", "Z1", 1)]
        );
    }

    #[test]
    fn test_counts_and_order() {
        let pairs = vec![
            pair(0, "Pub", "Z2"),
            pair(1, "Cafe", "Z1"),
            pair(2, "Pub", "Z2"),
            pair(3, "Pub", "Z1"),
            pair(4, "Pub", "Z2"),
            pair(5, "Cafe", "Z1"),
        ];

        assert_eq!(
            rows(&aggregate(&pairs)),
            vec![("Pub", "Z2", 3), ("Cafe", "Z1", 2), ("Pub", "Z1", 1)]
        );
    }

    #[test]
    fn test_count_matches_pairs() {
        let mut pairs = Vec::new();
        for i in 0..200 {
            let category = ["Cafe", "Pub", "Bar"][i % 3];
            let zone = format!("Z{}", i % 7);
            pairs.push(pair(i, category, &zone));
        }

        let records = aggregate(&pairs);

        let total: u32 = records.iter().map(|r| r.count).sum();
        assert_eq!(total as usize, pairs.len());
        for r in &records {
            let expected = pairs
                .iter()
                .filter(|p| p.category == r.category && p.zone_key == r.zone_key)
                .count();
            assert_eq!(r.count as usize, expected);
        }
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let mut pairs: Vec<JoinPair> = (0..60)
            .map(|i| pair(i, ["Cafe", "Pub"][i % 2], ["A", "B", "C", "D"][i % 4]))
            .collect();
        let first = aggregate(&pairs);

        pairs.reverse();
        pairs.rotate_left(17);
        assert_eq!(aggregate(&pairs), first);
    }

    #[test]
    fn test_empty() {
        assert!(aggregate(&[]).is_empty());
    }
}
