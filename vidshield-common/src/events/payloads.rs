//! Stream event payload definitions
//!
//! One struct per named event on the processing progress stream. Every
//! field the server may omit or send as `null` is defaulted so a sparse
//! payload still decodes.

use super::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `initial_state` - full snapshot sent once per (re)connection
///
/// Hydrates the client without the progress reset a `phase_change` implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialStatePayload {
    #[serde(default)]
    pub video_id: String,
    pub phase: Phase,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub message: String,
    /// Latest count per detection category
    #[serde(default)]
    pub detections: HashMap<String, u64>,
    #[serde(default)]
    pub elapsed_seconds: f64,
}

/// `phase_change` - the job entered a new phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChangePayload {
    pub phase: Phase,
    #[serde(default)]
    pub previous_phase: Option<Phase>,
    #[serde(default)]
    pub message: String,
    /// Server estimate for the duration of the new phase
    #[serde(default)]
    pub estimated_time_seconds: Option<f64>,
}

/// `progress` - percentage/counter update within the current phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    /// Phase the server believes it is in (informational only)
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `detection` - latest count for one detection category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub detection_type: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub frame_number: Option<u64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `verification` - multi-agent verification progress for one finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPayload {
    #[serde(default)]
    pub vulnerability_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub agents_completed: u32,
    #[serde(default)]
    pub total_agents: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl VerificationPayload {
    /// Percentage of agents finished, `None` when the agent total is unknown
    pub fn progress_percent(&self) -> Option<f64> {
        if self.total_agents == 0 {
            return None;
        }
        Some((self.agents_completed as f64 / self.total_agents as f64 * 100.0).round())
    }
}

/// `complete` - job finished successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub total_vulnerabilities: u64,
    #[serde(default)]
    pub total_violations: u64,
    #[serde(default)]
    pub processing_time_seconds: f64,
    /// Route to open once the job is done
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `error` - server-reported terminal failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Free-form diagnostic detail (string or object)
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub recoverable: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}
