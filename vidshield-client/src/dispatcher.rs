//! Stream event dispatcher
//!
//! Applies one decoded [`StreamEvent`] to the [`ProcessingState`] and returns
//! the [`Effect`]s the client must carry out (timers, transport, prefetch).
//! Dispatch is synchronous: an event is fully applied before the next one is
//! looked at, and nothing here awaits.
//!
//! **Routing:**
//! - `initial_state` → session hydrate, detection snapshot, clock rebase, prefetch gate
//! - `phase_change` → phase set + progress reset, prefetch gate
//! - `progress` → progress/counters only
//! - `detection` → aggregator upsert
//! - `verification` → progress derived from agent counts
//! - `complete` / `error` → terminal, handed to the side-effect controller
//! - `heartbeat` / untyped → no state change

use crate::live_updates::UpdateCategory;
use crate::state::ProcessingState;
use crate::transport::RawEvent;
use tracing::{debug, error, info};
use vidshield_common::events::{
    CompletePayload, DetectionPayload, ErrorPayload, InitialStatePayload, PhaseChangePayload,
    ProgressPayload, VerificationPayload,
};
use vidshield_common::{Phase, StreamEvent};

/// Progress must move this many points before it is written to the live log
pub const PROGRESS_REPORT_STEP: u8 = 5;

/// Work the client performs after an event has been applied
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Re-base the elapsed clock on the server's figure (seconds)
    RebaseElapsed(f64),
    /// Issue the violation prefetch (the gate is already closed)
    PrefetchViolations,
    /// Stop the 1-second elapsed tick
    StopElapsedTimer,
    /// Close the stream; no reconnection follows
    CloseStream,
    /// Arm the completion redirect
    ScheduleRedirect,
    /// Start the error countdown
    StartErrorCountdown,
}

/// Decode a raw transport message
pub fn decode(raw: &RawEvent) -> vidshield_common::Result<StreamEvent> {
    StreamEvent::parse(&raw.event, &raw.data)
}

/// Apply `event` to `state`
///
/// # Returns
/// Effects to execute, in order. Empty for heartbeats, untyped messages and
/// anything arriving after the session turned terminal.
pub fn dispatch(state: &mut ProcessingState, event: StreamEvent) -> Vec<Effect> {
    if state.session.is_terminal() && !matches!(event, StreamEvent::Heartbeat) {
        debug!(
            event_type = event.event_type(),
            "Session is terminal, ignoring event"
        );
        return Vec::new();
    }

    match event {
        StreamEvent::InitialState(payload) => on_initial_state(state, &payload),
        StreamEvent::PhaseChange(payload) => on_phase_change(state, &payload),
        StreamEvent::Progress(payload) => {
            on_progress(state, &payload);
            Vec::new()
        }
        StreamEvent::Detection(payload) => {
            on_detection(state, &payload);
            Vec::new()
        }
        StreamEvent::Verification(payload) => {
            on_verification(state, &payload);
            Vec::new()
        }
        StreamEvent::Complete(payload) => on_complete(state, &payload),
        StreamEvent::Error(payload) => on_error(state, &payload),
        StreamEvent::Heartbeat => {
            debug!("Heartbeat");
            Vec::new()
        }
        StreamEvent::Untyped { event, data } => {
            debug!(event = %event, len = data.len(), "Ignoring untyped stream message");
            Vec::new()
        }
    }
}

fn on_initial_state(state: &mut ProcessingState, payload: &InitialStatePayload) -> Vec<Effect> {
    let transition = state.session.apply_initial_state(payload);
    state.detections.hydrate(&payload.detections);

    info!(
        session_id = %state.session.session_id,
        phase = %transition.new_phase,
        progress = state.session.progress,
        "Initial state received"
    );

    let mut effects = Vec::new();
    if payload.elapsed_seconds > 0.0 {
        effects.push(Effect::RebaseElapsed(payload.elapsed_seconds));
    }
    effects.extend(prefetch_gate(state));
    effects
}

fn on_phase_change(state: &mut ProcessingState, payload: &PhaseChangePayload) -> Vec<Effect> {
    let transition = state.session.apply_phase_change(payload);

    info!(
        session_id = %state.session.session_id,
        from = %transition.old_phase,
        to = %transition.new_phase,
        "Phase changed"
    );
    state
        .live_updates
        .add(format!("Phase: {}", payload.phase.label()), UpdateCategory::Phase);

    prefetch_gate(state).into_iter().collect()
}

fn on_progress(state: &mut ProcessingState, payload: &ProgressPayload) {
    let reported = state.session.apply_progress(
        payload.progress,
        payload.current,
        payload.total,
        &payload.message,
        PROGRESS_REPORT_STEP,
    );
    debug!(progress = state.session.progress, "Progress");

    if reported {
        let message = format!(
            "{}: {}%",
            state.session.phase.label(),
            state.session.progress
        );
        state.live_updates.add(message, UpdateCategory::Progress);
    }
}

fn on_detection(state: &mut ProcessingState, payload: &DetectionPayload) {
    let entry = state
        .detections
        .upsert(&payload.detection_type, payload.count);
    debug!(category = %entry.category, count = entry.count, "Detection count");

    let message = if payload.message.is_empty() {
        format!(
            "{} {} detected: {}",
            entry.display_icon, entry.category, entry.count
        )
    } else {
        payload.message.clone()
    };
    state.live_updates.add(message, UpdateCategory::Detection);
}

fn on_verification(state: &mut ProcessingState, payload: &VerificationPayload) {
    if let Some(percent) = payload.progress_percent() {
        state.session.apply_progress(
            percent,
            Some(payload.agents_completed as u64),
            Some(payload.total_agents as u64),
            &payload.message,
            PROGRESS_REPORT_STEP,
        );
    } else if !payload.message.is_empty() {
        state.session.message = payload.message.clone();
    }

    let message = if payload.message.is_empty() {
        format!(
            "Verification: {}/{} agents",
            payload.agents_completed, payload.total_agents
        )
    } else {
        payload.message.clone()
    };
    state.live_updates.add(message, UpdateCategory::Verification);
}

fn on_complete(state: &mut ProcessingState, payload: &CompletePayload) -> Vec<Effect> {
    state.session.mark_complete(payload);

    info!(
        session_id = %state.session.session_id,
        violations = payload.total_violations,
        vulnerabilities = payload.total_vulnerabilities,
        "Processing complete"
    );
    let message = if payload.message.is_empty() {
        "Processing complete".to_string()
    } else {
        payload.message.clone()
    };
    state.live_updates.add(message, UpdateCategory::Complete);

    vec![Effect::StopElapsedTimer, Effect::ScheduleRedirect]
}

fn on_error(state: &mut ProcessingState, payload: &ErrorPayload) -> Vec<Effect> {
    state.session.mark_error(payload);
    let message = state.session.error_message.clone().unwrap_or_default();

    error!(
        session_id = %state.session.session_id,
        code = payload.code.as_deref().unwrap_or("-"),
        recoverable = payload.recoverable,
        "Processing failed: {}",
        message
    );
    state
        .live_updates
        .add(format!("Error: {}", message), UpdateCategory::Error);

    vec![
        Effect::StopElapsedTimer,
        Effect::CloseStream,
        Effect::StartErrorCountdown,
    ]
}

/// Close the prefetch gate and request the fetch when review is reached
fn prefetch_gate(state: &mut ProcessingState) -> Option<Effect> {
    if state.violations.should_fetch(state.session.phase) {
        state.violations.begin();
        debug!(phase = %Phase::WaitingForReview, "Violation prefetch triggered");
        Some(Effect::PrefetchViolations)
    } else {
        None
    }
}
