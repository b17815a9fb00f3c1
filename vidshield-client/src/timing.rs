//! Elapsed time tracking and ETA estimation
//!
//! Elapsed time is measured on the tokio clock so it follows paused/advanced
//! time in tests. The ETA is always derived, never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;
use vidshield_common::human_time::format_remaining;

/// Wall-clock tracker for one processing session
#[derive(Debug, Clone, Default)]
pub struct TimingTracker {
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

impl TimingTracker {
    /// Record the session start (now)
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.started_at = Some(Utc::now());
    }

    /// Move the start back so `elapsed_seconds` equals the server's figure
    ///
    /// Negative, NaN and out-of-range figures leave the clock untouched;
    /// returns whether the rebase was applied.
    pub fn rebase(&mut self, elapsed_seconds: f64) -> bool {
        let offset = match Duration::try_from_secs_f64(elapsed_seconds) {
            Ok(offset) => offset,
            Err(e) => {
                warn!(elapsed_seconds, error = %e, "Ignoring unusable server elapsed time");
                return false;
            }
        };
        let now = Instant::now();
        self.started = Some(now.checked_sub(offset).unwrap_or(now));
        self.started_at = Some(
            Utc::now()
                - chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero()),
        );
        true
    }

    /// Whole seconds since start, 0 when not started
    pub fn elapsed_seconds(&self) -> u64 {
        self.started
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.started_at = None;
    }
}

/// Derived time-remaining estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "seconds", rename_all = "snake_case")]
pub enum Eta {
    /// No progress yet, nothing to extrapolate from
    Calculating,
    /// Estimated seconds remaining
    Remaining(u64),
    /// Job completed or failed
    Done,
}

impl Eta {
    /// Linear extrapolation from elapsed time and percentage progress
    ///
    /// `estimated_total = elapsed / progress * 100`, remaining clamped at 0.
    pub fn estimate(elapsed_seconds: u64, progress: u8, finished: bool) -> Self {
        if finished {
            return Eta::Done;
        }
        if progress == 0 {
            return Eta::Calculating;
        }

        let elapsed = elapsed_seconds as f64;
        let estimated_total = elapsed / progress as f64 * 100.0;
        let remaining = (estimated_total - elapsed).max(0.0);
        Eta::Remaining(remaining.round() as u64)
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Calculating => f.write_str("Calculating..."),
            Eta::Remaining(seconds) => f.write_str(&format_remaining(*seconds)),
            Eta::Done => f.write_str("Done"),
        }
    }
}
