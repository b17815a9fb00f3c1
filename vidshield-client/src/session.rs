//! Processing session state machine
//!
//! Session phase follows whatever the server reports:
//! IDLE → UPLOADING → DETECTING → TRACKING → VERIFYING → SAVING →
//! WAITING_FOR_REVIEW → ANONYMIZING → COMPLETED, plus ERROR from anywhere.
//!
//! There is no transition table; orderings are the server's responsibility.
//! The session becomes terminal when a `complete` or `error` event has been
//! applied (or the connection was given up on); callers stop applying
//! transitions once [`ProcessingSession::is_terminal`] is true. A
//! `phase_change` into COMPLETED only moves the phase, so the `complete`
//! event that follows it is still honoured.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vidshield_common::events::{
    CompletePayload, ErrorPayload, InitialStatePayload, PhaseChangePayload,
};
use vidshield_common::Phase;

/// Phase transition record
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransition {
    pub session_id: Uuid,
    pub old_phase: Phase,
    pub new_phase: Phase,
    pub transitioned_at: DateTime<Utc>,
}

/// Summary carried by the `complete` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    pub total_vulnerabilities: u64,
    pub total_violations: u64,
    pub processing_time_seconds: f64,
}

/// Client-side view of one processing job
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSession {
    /// Correlation id minted per fresh job
    pub session_id: Uuid,

    pub video_id: Option<String>,

    /// Current job phase
    pub phase: Phase,
    pub previous_phase: Option<Phase>,

    /// Percentage within the current phase (0-100)
    pub progress: u8,
    pub message: String,
    pub current: Option<u64>,
    pub total: Option<u64>,

    /// Server estimate for the current phase, from `phase_change`
    pub phase_estimate_seconds: Option<f64>,

    /// Stream transport is open
    pub connected: bool,
    /// Consecutive transport failures
    pub reconnect_attempts: u32,

    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,

    pub is_complete: bool,
    pub completion: Option<CompletionSummary>,
    pub redirect_url: Option<String>,

    pub is_error: bool,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub error_details: Option<serde_json::Value>,
    pub error_recoverable: bool,
    /// Seconds left before the error fallback redirect
    pub redirect_countdown: Option<u32>,

    /// Malformed stream messages dropped this session
    pub dropped_events: u64,

    /// Progress value at the last progress live update
    #[serde(skip)]
    pub(crate) last_reported_progress: u8,
}

impl Default for ProcessingSession {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            video_id: None,
            phase: Phase::Idle,
            previous_phase: None,
            progress: 0,
            message: String::new(),
            current: None,
            total: None,
            phase_estimate_seconds: None,
            connected: false,
            reconnect_attempts: 0,
            started_at: None,
            elapsed_seconds: 0,
            is_complete: false,
            completion: None,
            redirect_url: None,
            is_error: false,
            error_message: None,
            error_code: None,
            error_details: None,
            error_recoverable: false,
            redirect_countdown: None,
            dropped_events: 0,
            last_reported_progress: 0,
        }
    }
}

/// Clamp a wire percentage into 0-100
pub fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

impl ProcessingSession {
    /// Fresh session for a job
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Self::default()
        }
    }

    /// Completed, failed, or given up on
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.is_error
    }

    /// Set phase unconditionally
    pub fn transition_to(&mut self, new_phase: Phase) -> PhaseTransition {
        let transition = PhaseTransition {
            session_id: self.session_id,
            old_phase: self.phase,
            new_phase,
            transitioned_at: Utc::now(),
        };
        if self.phase != new_phase {
            self.previous_phase = Some(self.phase);
        }
        self.phase = new_phase;
        transition
    }

    /// Hydrate from a connect/reconnect snapshot (no progress reset)
    pub fn apply_initial_state(&mut self, payload: &InitialStatePayload) -> PhaseTransition {
        if !payload.video_id.is_empty() {
            self.video_id = Some(payload.video_id.clone());
        }
        let transition = self.transition_to(payload.phase);
        self.progress = clamp_progress(payload.progress);
        self.last_reported_progress = self.progress;
        self.current = payload.current;
        self.total = payload.total;
        self.message = payload.message.clone();
        transition
    }

    /// Enter a new phase; progress restarts at 0
    pub fn apply_phase_change(&mut self, payload: &PhaseChangePayload) -> PhaseTransition {
        let transition = self.transition_to(payload.phase);
        self.progress = 0;
        self.last_reported_progress = 0;
        self.current = None;
        self.total = None;
        self.phase_estimate_seconds = payload.estimated_time_seconds;
        if !payload.message.is_empty() {
            self.message = payload.message.clone();
        }
        transition
    }

    /// Update progress/counters; never changes phase
    ///
    /// Returns true when progress moved at least `report_step` points since
    /// the last reported value (the caller logs it and the mark advances).
    pub fn apply_progress(
        &mut self,
        progress: f64,
        current: Option<u64>,
        total: Option<u64>,
        message: &str,
        report_step: u8,
    ) -> bool {
        self.progress = clamp_progress(progress);
        if current.is_some() || total.is_some() {
            self.current = current;
            self.total = total;
        }
        if !message.is_empty() {
            self.message = message.to_string();
        }

        let moved = self.progress.abs_diff(self.last_reported_progress);
        if moved >= report_step {
            self.last_reported_progress = self.progress;
            true
        } else {
            false
        }
    }

    /// Terminal success
    pub fn mark_complete(&mut self, payload: &CompletePayload) {
        self.transition_to(Phase::Completed);
        self.progress = 100;
        self.is_complete = true;
        if !payload.message.is_empty() {
            self.message = payload.message.clone();
        }
        self.redirect_url = payload
            .redirect_url
            .clone()
            .filter(|url| !url.trim().is_empty());
        self.completion = Some(CompletionSummary {
            total_vulnerabilities: payload.total_vulnerabilities,
            total_violations: payload.total_violations,
            processing_time_seconds: payload.processing_time_seconds,
        });
    }

    /// Terminal failure reported by the server
    pub fn mark_error(&mut self, payload: &ErrorPayload) {
        self.transition_to(Phase::Error);
        self.is_error = true;
        let message = if payload.message.is_empty() {
            "Processing failed".to_string()
        } else {
            payload.message.clone()
        };
        self.message = message.clone();
        self.error_message = Some(message);
        self.error_code = payload.code.clone();
        self.error_details = payload.details.clone();
        self.error_recoverable = payload.recoverable;
    }

    /// Retry budget exhausted; phase is left as last reported
    pub fn mark_connection_lost(&mut self, message: impl Into<String>) {
        self.connected = false;
        self.is_error = true;
        self.error_message = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_change(phase: Phase) -> PhaseChangePayload {
        PhaseChangePayload {
            phase,
            previous_phase: None,
            message: String::new(),
            estimated_time_seconds: None,
        }
    }

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(-3.0), 0);
        assert_eq!(clamp_progress(49.6), 50);
        assert_eq!(clamp_progress(250.0), 100);
        assert_eq!(clamp_progress(f64::NAN), 0);
        assert_eq!(clamp_progress(f64::INFINITY), 100);
    }

    #[test]
    fn test_phase_change_resets_progress() {
        let mut session = ProcessingSession::new("vid1");
        session.apply_progress(80.0, Some(8), Some(10), "", 5);
        assert_eq!(session.progress, 80);

        let transition = session.apply_phase_change(&phase_change(Phase::Verifying));
        assert_eq!(transition.old_phase, Phase::Idle);
        assert_eq!(transition.new_phase, Phase::Verifying);
        assert_eq!(session.progress, 0);
        assert_eq!(session.previous_phase, Some(Phase::Idle));
        assert!(session.current.is_none());
    }

    #[test]
    fn test_initial_state_keeps_payload_progress() {
        let mut session = ProcessingSession::new("vid1");
        session.apply_initial_state(&InitialStatePayload {
            video_id: "vid1".to_string(),
            phase: Phase::Tracking,
            progress: 37.0,
            current: Some(37),
            total: Some(100),
            message: "Tracking".to_string(),
            detections: Default::default(),
            elapsed_seconds: 12.0,
        });

        assert_eq!(session.phase, Phase::Tracking);
        assert_eq!(session.progress, 37);
        assert_eq!(session.total, Some(100));
    }

    #[test]
    fn test_progress_report_step() {
        let mut session = ProcessingSession::new("vid1");
        assert!(!session.apply_progress(3.0, None, None, "", 5));
        assert!(session.apply_progress(5.0, None, None, "", 5));
        assert!(!session.apply_progress(9.0, None, None, "", 5));
        assert!(session.apply_progress(10.0, None, None, "", 5));
        assert_eq!(session.progress, 10);
    }

    #[test]
    fn test_mark_complete_is_terminal() {
        let mut session = ProcessingSession::new("vid1");
        session.mark_complete(&CompletePayload {
            video_id: "vid1".to_string(),
            total_vulnerabilities: 2,
            total_violations: 7,
            processing_time_seconds: 93.5,
            redirect_url: Some("  ".to_string()),
            message: "Done".to_string(),
            timestamp: None,
        });

        assert!(session.is_terminal());
        assert_eq!(session.phase, Phase::Completed);
        assert_eq!(session.progress, 100);
        // Blank redirect treated as absent
        assert!(session.redirect_url.is_none());
        assert_eq!(session.completion.as_ref().unwrap().total_violations, 7);
    }

    #[test]
    fn test_completed_phase_alone_is_not_terminal() {
        let mut session = ProcessingSession::new("vid1");
        session.apply_phase_change(&phase_change(Phase::Completed));
        assert_eq!(session.phase, Phase::Completed);
        assert!(!session.is_terminal());
    }

    #[test]
    fn test_connection_lost_keeps_phase() {
        let mut session = ProcessingSession::new("vid1");
        session.transition_to(Phase::Detecting);
        session.mark_connection_lost("gone");

        assert!(session.is_error);
        assert!(session.is_terminal());
        assert_eq!(session.phase, Phase::Detecting);
    }
}
