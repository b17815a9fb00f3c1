//! Bounded trail of recent human-readable events
//!
//! Most recent first, never more than [`MAX_LIVE_UPDATES`] entries. Older
//! entries are dropped, not archived.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum retained entries
pub const MAX_LIVE_UPDATES: usize = 5;

/// What produced a live update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCategory {
    Connection,
    Phase,
    Progress,
    Detection,
    Verification,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveUpdateEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub category: UpdateCategory,
}

/// Most-recent-first bounded log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LiveUpdateLog {
    entries: VecDeque<LiveUpdateEntry>,
}

impl LiveUpdateLog {
    /// Prepend an entry and drop anything beyond the bound
    pub fn add(&mut self, message: impl Into<String>, category: UpdateCategory) {
        self.entries.push_front(LiveUpdateEntry {
            timestamp: Utc::now(),
            message: message.into(),
            category,
        });
        self.entries.truncate(MAX_LIVE_UPDATES);
    }

    /// Newest entry, if any
    pub fn latest(&self) -> Option<&LiveUpdateEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveUpdateEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LiveUpdateEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = LiveUpdateLog::default();
        log.add("first", UpdateCategory::Connection);
        log.add("second", UpdateCategory::Phase);

        assert_eq!(log.latest().unwrap().message, "second");
        let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[test]
    fn test_bounded_to_five() {
        let mut log = LiveUpdateLog::default();
        for i in 0..12 {
            log.add(format!("update {}", i), UpdateCategory::Progress);
            assert!(log.len() <= MAX_LIVE_UPDATES);
        }

        assert_eq!(log.len(), MAX_LIVE_UPDATES);
        assert_eq!(log.latest().unwrap().message, "update 11");
        assert_eq!(log.iter().last().unwrap().message, "update 7");
    }

    #[test]
    fn test_serializes_as_list() {
        let mut log = LiveUpdateLog::default();
        log.add("boom", UpdateCategory::Error);

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["message"], "boom");
        assert_eq!(json[0]["category"], "error");
    }
}
