//! Published client state
//!
//! [`ProcessingState`] is the snapshot handed to subscribers after every
//! mutation. Derived values (detection list and total, formatted elapsed
//! time, ETA) are computed on read and never stored.

use crate::detections::{DetectionAggregator, DetectionCount};
use crate::live_updates::LiveUpdateLog;
use crate::prefetch::ViolationPrefetchState;
use crate::session::ProcessingSession;
use crate::timing::Eta;
use serde::Serialize;
use vidshield_common::human_time::format_elapsed;

/// Everything a consumer can read about the followed job
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingState {
    pub session: ProcessingSession,
    pub detections: DetectionAggregator,
    pub live_updates: LiveUpdateLog,
    pub violations: ViolationPrefetchState,
}

impl ProcessingState {
    /// Fresh state for a job
    pub fn for_job(job_id: &str) -> Self {
        Self {
            session: ProcessingSession::new(job_id),
            ..Self::default()
        }
    }

    /// Per-category counts in category order
    pub fn detections_list(&self) -> Vec<DetectionCount> {
        self.detections.list()
    }

    /// Sum of the current per-category counts
    pub fn total_detections(&self) -> u64 {
        self.detections.total()
    }

    /// Elapsed time as `M:SS` / `H:MM:SS`
    pub fn formatted_elapsed(&self) -> String {
        format_elapsed(self.session.elapsed_seconds)
    }

    pub fn eta(&self) -> Eta {
        Eta::estimate(
            self.session.elapsed_seconds,
            self.session.progress,
            self.session.is_complete || self.session.is_error,
        )
    }
}
