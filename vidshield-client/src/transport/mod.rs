//! Push-stream transport abstraction
//!
//! The connection manager only needs "open a stream of named text events for
//! a job". [`EventTransport`] is that seam: the production implementation is
//! SSE over reqwest ([`SseTransport`]); tests inject scripted transports, and
//! a WebSocket or long-poll transport can be dropped in without touching the
//! state machine.
//!
//! Lifecycle mapping:
//! - `open()` returning `Ok` → connection open
//! - `Err` from `open()` or from the stream → transport error
//! - stream end → transport closed

mod sse;

pub use sse::{stream_url, SseTransport};

use crate::error::ClientResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// One named text message as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Event name (`message` when the frame had none)
    pub event: String,
    /// Payload text, JSON for typed events
    pub data: String,
}

impl RawEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Open stream of raw events; dropping it closes the underlying connection
pub type EventStream = BoxStream<'static, ClientResult<RawEvent>>;

/// Transport able to open a progress stream for a job
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Open the progress stream for `job_id`, authenticating with `token`
    async fn open(&self, job_id: &str, token: Option<&str>) -> ClientResult<EventStream>;
}
