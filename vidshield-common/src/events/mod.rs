//! Event types for the VidShield processing progress stream
//!
//! The worker pushes named SSE messages whose `data` field is a JSON object.
//! [`StreamEvent::parse`] turns one (name, data) pair into a typed event.

mod payloads;

pub use payloads::{
    CompletePayload, DetectionPayload, ErrorPayload, InitialStatePayload, PhaseChangePayload,
    ProgressPayload, VerificationPayload,
};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing job phase
///
/// Nominal order: IDLE → UPLOADING → DETECTING → TRACKING → VERIFYING →
/// SAVING → WAITING_FOR_REVIEW → ANONYMIZING → COMPLETED, with ERROR
/// reachable from anywhere. The order is not enforced client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing reported yet
    #[default]
    Idle,
    /// Video upload in progress
    Uploading,
    /// Per-frame object detection
    Detecting,
    /// Cross-frame object tracking
    Tracking,
    /// Multi-agent verification of findings
    Verifying,
    /// Persisting results
    Saving,
    /// Findings ready, waiting on a human reviewer
    WaitingForReview,
    /// Rendering the anonymized output
    Anonymizing,
    /// Job finished successfully
    Completed,
    /// Job failed
    Error,
}

impl Phase {
    /// Wire name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Detecting => "detecting",
            Phase::Tracking => "tracking",
            Phase::Verifying => "verifying",
            Phase::Saving => "saving",
            Phase::WaitingForReview => "waiting_for_review",
            Phase::Anonymizing => "anonymizing",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Waiting to start",
            Phase::Uploading => "Uploading video",
            Phase::Detecting => "Detecting objects",
            Phase::Tracking => "Tracking objects",
            Phase::Verifying => "Verifying findings",
            Phase::Saving => "Saving results",
            Phase::WaitingForReview => "Waiting for review",
            Phase::Anonymizing => "Anonymizing video",
            Phase::Completed => "Completed",
            Phase::Error => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded message from the progress stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// State snapshot sent on connect/reconnect
    InitialState(InitialStatePayload),
    /// Job moved to a new phase
    PhaseChange(PhaseChangePayload),
    /// Progress within the current phase
    Progress(ProgressPayload),
    /// Detection count snapshot for one category
    Detection(DetectionPayload),
    /// Verification agent progress
    Verification(VerificationPayload),
    /// Job finished
    Complete(CompletePayload),
    /// Job failed (server-reported, terminal)
    Error(ErrorPayload),
    /// Liveness signal, no payload
    Heartbeat,
    /// Message without a recognised event name
    Untyped {
        /// Event name as received (`message` when the frame had none)
        event: String,
        /// Raw data field
        data: String,
    },
}

impl StreamEvent {
    /// Decode a named SSE message
    ///
    /// # Arguments
    /// * `event` - SSE `event:` field (`""` or `"message"` when absent)
    /// * `data` - SSE `data:` field, a JSON object for typed events
    ///
    /// # Returns
    /// * `Ok(StreamEvent)` - typed event, or `Untyped` for unknown names
    /// * `Err(Error::Parse)` - known name with an undecodable payload
    pub fn parse(event: &str, data: &str) -> Result<Self> {
        fn decode<T: serde::de::DeserializeOwned>(event: &str, data: &str) -> Result<T> {
            serde_json::from_str(data).map_err(|e| Error::Parse {
                event: event.to_string(),
                message: e.to_string(),
            })
        }

        let parsed = match event {
            "initial_state" => StreamEvent::InitialState(decode(event, data)?),
            "phase_change" => StreamEvent::PhaseChange(decode(event, data)?),
            "progress" => StreamEvent::Progress(decode(event, data)?),
            "detection" => StreamEvent::Detection(decode(event, data)?),
            "verification" => StreamEvent::Verification(decode(event, data)?),
            "complete" => StreamEvent::Complete(decode(event, data)?),
            "error" => StreamEvent::Error(decode(event, data)?),
            "heartbeat" => StreamEvent::Heartbeat,
            "" => StreamEvent::Untyped {
                event: "message".to_string(),
                data: data.to_string(),
            },
            other => StreamEvent::Untyped {
                event: other.to_string(),
                data: data.to_string(),
            },
        };
        Ok(parsed)
    }

    /// Get event type as string for logging
    pub fn event_type(&self) -> &str {
        match self {
            StreamEvent::InitialState(_) => "initial_state",
            StreamEvent::PhaseChange(_) => "phase_change",
            StreamEvent::Progress(_) => "progress",
            StreamEvent::Detection(_) => "detection",
            StreamEvent::Verification(_) => "verification",
            StreamEvent::Complete(_) => "complete",
            StreamEvent::Error(_) => "error",
            StreamEvent::Heartbeat => "heartbeat",
            StreamEvent::Untyped { event, .. } => event,
        }
    }
}
