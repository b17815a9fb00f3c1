//! Per-category detection counts
//!
//! Each `detection` event carries the server's latest count for one
//! category, so a repeat for the same category replaces the stored value.
//! Whether the server always sends cumulative snapshots (not deltas) is
//! unconfirmed; the overwrite is pinned by a test below.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Icon for categories without a dedicated one
pub const GENERIC_ICON: &str = "🔍";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionCount {
    pub category: String,
    pub count: u64,
    pub display_icon: String,
}

/// Display icon for a detection category
pub fn icon_for(category: &str) -> &'static str {
    match category {
        "face" => "👤",
        "person" => "🚶",
        "license_plate" => "🚗",
        "text" => "📝",
        "screen" => "🖥️",
        "document" => "📄",
        "logo" => "🏷️",
        _ => GENERIC_ICON,
    }
}

/// Latest-known count per category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DetectionAggregator {
    // BTreeMap keeps the exposed list in stable category order
    counts: BTreeMap<String, DetectionCount>,
}

impl DetectionAggregator {
    /// Insert or overwrite the count for `category`
    pub fn upsert(&mut self, category: &str, count: u64) -> &DetectionCount {
        let entry = self
            .counts
            .entry(category.to_string())
            .or_insert_with(|| DetectionCount {
                category: category.to_string(),
                count: 0,
                display_icon: icon_for(category).to_string(),
            });
        entry.count = count;
        entry
    }

    /// Replace every count with a server snapshot
    pub fn hydrate(&mut self, snapshot: &HashMap<String, u64>) {
        self.counts.clear();
        for (category, count) in snapshot {
            self.upsert(category, *count);
        }
    }

    pub fn get(&self, category: &str) -> Option<&DetectionCount> {
        self.counts.get(category)
    }

    pub fn list(&self) -> Vec<DetectionCount> {
        self.counts.values().cloned().collect()
    }

    /// Sum over all categories, recomputed on every call (saturating)
    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |acc, d| acc.saturating_add(d.count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_category_overwrites_not_sums() {
        let mut agg = DetectionAggregator::default();
        agg.upsert("face", 3);
        agg.upsert("face", 5);

        // Overwrite semantics: 5, not 8
        assert_eq!(agg.get("face").unwrap().count, 5);
        assert_eq!(agg.total(), 5);
    }

    #[test]
    fn test_total_spans_categories() {
        let mut agg = DetectionAggregator::default();
        agg.upsert("face", 4);
        agg.upsert("license_plate", 2);
        agg.upsert("face", 1);

        assert_eq!(agg.total(), 3);
        let categories: Vec<_> = agg.list().into_iter().map(|d| d.category).collect();
        assert_eq!(categories, vec!["face", "license_plate"]);
    }

    #[test]
    fn test_total_saturates_on_huge_counts() {
        let mut agg = DetectionAggregator::default();
        agg.upsert("face", u64::MAX);
        agg.upsert("text", 1);

        assert_eq!(agg.total(), u64::MAX);
    }

    #[test]
    fn test_unknown_category_gets_generic_icon() {
        let mut agg = DetectionAggregator::default();
        assert_eq!(agg.upsert("tattoo", 1).display_icon, GENERIC_ICON);
        assert_eq!(agg.upsert("face", 1).display_icon, "👤");
    }

    #[test]
    fn test_hydrate_replaces_existing() {
        let mut agg = DetectionAggregator::default();
        agg.upsert("text", 9);

        let snapshot = HashMap::from([("face".to_string(), 2), ("person".to_string(), 7)]);
        agg.hydrate(&snapshot);

        assert!(agg.get("text").is_none());
        assert_eq!(agg.total(), 9);
    }
}
