//! Test Helper Utilities
//!
//! Scripted collaborators for driving `ProcessingClient` without a network:
//! - `ScriptedTransport` - each `open()` consumes the next scripted outcome
//! - `RecordingNavigator` - records every redirect
//! - `FakeViolations` - counts calls, can fail or hold the response

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc as stream_channel;
use futures::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vidshield_client::prefetch::{ViolationPage, ViolationRecord};
use vidshield_client::transport::{EventStream, EventTransport, RawEvent};
use vidshield_client::{
    ClientConfig, ClientError, ClientResult, Collaborators, Navigator, ProcessingClient,
    StaticToken, ViolationsApi,
};

pub const TEST_TOKEN: &str = "test-token";

/// Let spawned tasks (readers, timers, the client) run to quiescence
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Transport
// ============================================================================

enum Script {
    Refuse(String),
    Accept(stream_channel::UnboundedReceiver<ClientResult<RawEvent>>),
}

/// Server side of one scripted stream; dropping it ends the stream
pub struct StreamHandle {
    tx: stream_channel::UnboundedSender<ClientResult<RawEvent>>,
}

impl StreamHandle {
    /// Push a named JSON event (ignored once the reader is gone)
    pub fn send(&self, event: &str, data: Value) {
        let _ = self
            .tx
            .unbounded_send(Ok(RawEvent::new(event, data.to_string())));
    }

    /// Push a raw, possibly malformed, message
    pub fn send_raw(&self, event: &str, data: &str) {
        let _ = self.tx.unbounded_send(Ok(RawEvent::new(event, data)));
    }

    /// Break the stream with a read error
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .unbounded_send(Err(ClientError::Transport(reason.to_string())));
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    opens: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedTransport {
    /// Next open succeeds; events are pushed through the returned handle
    pub fn accept_next(&self) -> StreamHandle {
        let (tx, rx) = stream_channel::unbounded();
        self.scripts.lock().unwrap().push_back(Script::Accept(rx));
        StreamHandle { tx }
    }

    /// Next open fails
    pub fn refuse_next(&self, reason: &str) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Refuse(reason.to_string()));
    }

    /// Number of `open()` calls so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Tokens presented on each open
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self, _job_id: &str, token: Option<&str>) -> ClientResult<EventStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.map(str::to_string));

        // Unscripted opens are refused
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Accept(rx)) => Ok(rx.boxed()),
            Some(Script::Refuse(reason)) => Err(ClientError::Transport(reason)),
            None => Err(ClientError::Transport("connection refused".to_string())),
        }
    }
}

// ============================================================================
// Navigator
// ============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

// ============================================================================
// Violations API
// ============================================================================

#[derive(Default)]
pub struct FakeViolations {
    calls: AtomicUsize,
    fail: AtomicBool,
    hold: Option<Arc<Notify>>,
}

impl FakeViolations {
    /// Responses wait until `release()` is called on the returned notifier
    pub fn held() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let fake = Self {
            hold: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (fake, gate)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn sample_page() -> ViolationPage {
    let record = |id: &str, frame: u64| ViolationRecord {
        id: id.to_string(),
        violation_type: "face".to_string(),
        frame_number: Some(frame),
        timestamp_seconds: Some(frame as f64 / 30.0),
        confidence: Some(0.93),
        status: Some("pending".to_string()),
        description: None,
    };
    ViolationPage {
        items: vec![record("v1", 120), record("v2", 480)],
        total: 2,
    }
}

#[async_trait]
impl ViolationsApi for FakeViolations {
    async fn list_violations(&self, _job_id: &str) -> ClientResult<ViolationPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.hold {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 503,
                message: "violations unavailable".to_string(),
            });
        }
        Ok(sample_page())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub client: ProcessingClient,
    pub transport: Arc<ScriptedTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub violations: Arc<FakeViolations>,
}

pub fn harness() -> Harness {
    harness_with(ClientConfig::default(), FakeViolations::default())
}

pub fn harness_with(config: ClientConfig, violations: FakeViolations) -> Harness {
    let transport = Arc::new(ScriptedTransport::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let violations = Arc::new(violations);

    let client = ProcessingClient::spawn(
        config,
        Collaborators {
            transport: transport.clone(),
            violations: violations.clone(),
            navigator: navigator.clone(),
            tokens: Arc::new(StaticToken::new(Some(TEST_TOKEN.to_string()))),
        },
    );

    Harness {
        client,
        transport,
        navigator,
        violations,
    }
}
