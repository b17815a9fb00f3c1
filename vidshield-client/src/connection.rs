//! Stream connection manager
//!
//! Owns the single live transport reader and the reconnect bookkeeping.
//!
//! **Generations:** every `open()`/`close()` bumps the generation. Reader
//! tasks tag each [`TransportSignal`] with the generation they were started
//! under and the client drops signals whose generation is no longer current,
//! so a reader that was replaced or closed can never deliver an event twice
//! or trigger a second reconnect.
//!
//! **Job tracking:** `begin(job_id)` with a new job resets the attempt
//! counter (fresh session); the same job again keeps it (reconnection).

use crate::collaborators::TokenProvider;
use crate::error::{ClientError, ClientResult};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::transport::{EventTransport, RawEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reader lifecycle, as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Stream open; events follow
    Opened,
    /// One message
    Message(RawEvent),
    /// Open failed or the stream broke
    Failed(String),
    /// Stream ended without error
    Closed,
}

/// Signal tagged with the reader generation that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNotice {
    pub generation: u64,
    pub signal: TransportSignal,
}

pub struct ConnectionManager {
    transport: Arc<dyn EventTransport>,
    tokens: Arc<dyn TokenProvider>,
    policy: ReconnectPolicy,
    tx: mpsc::UnboundedSender<TransportNotice>,
    job_id: Option<String>,
    attempts: u32,
    generation: u64,
    reader: Option<CancellationToken>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn EventTransport>,
        tokens: Arc<dyn TokenProvider>,
        policy: ReconnectPolicy,
        tx: mpsc::UnboundedSender<TransportNotice>,
    ) -> Self {
        Self {
            transport,
            tokens,
            policy,
            tx,
            job_id: None,
            attempts: 0,
            generation: 0,
            reader: None,
        }
    }

    /// Track `job_id`; returns true when it differs from the tracked job
    pub fn begin(&mut self, job_id: &str) -> bool {
        if self.job_id.as_deref() == Some(job_id) {
            return false;
        }
        self.job_id = Some(job_id.to_string());
        self.attempts = 0;
        true
    }

    /// Start a reader for the tracked job, replacing any live one
    pub fn open(&mut self) -> ClientResult<()> {
        let job_id = self
            .job_id
            .clone()
            .ok_or_else(|| ClientError::Transport("No job to connect to".to_string()))?;

        self.close();
        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        self.reader = Some(cancel.clone());

        let transport = Arc::clone(&self.transport);
        let token = self.tokens.token();
        let tx = self.tx.clone();
        debug!(job_id = %job_id, generation, attempt = self.attempts, "Opening stream");

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(generation, "Stream reader cancelled");
                }
                _ = read_stream(transport, job_id, token, generation, tx) => {}
            }
        });
        Ok(())
    }

    /// Stop the live reader; returns whether one was running
    pub fn close(&mut self) -> bool {
        match self.reader.take() {
            Some(cancel) => {
                cancel.cancel();
                self.generation += 1;
                info!(job_id = self.job_id.as_deref().unwrap_or("-"), "Stream closed");
                true
            }
            None => false,
        }
    }

    /// Whether `generation` belongs to the live reader
    pub fn accept(&self, generation: u64) -> bool {
        self.reader.is_some() && generation == self.generation
    }

    /// Stream opened; the failure count starts over
    pub fn on_opened(&mut self) {
        self.attempts = 0;
    }

    /// Reader failed or ended; apply the reconnect policy
    pub fn on_failure(&mut self) -> ReconnectDecision {
        if let Some(cancel) = self.reader.take() {
            cancel.cancel();
        }
        let decision = self.policy.on_failure(self.attempts);
        self.attempts = match decision {
            ReconnectDecision::Retry { attempt, .. } => attempt,
            ReconnectDecision::GiveUp { attempts } => attempts,
        };
        decision
    }

    /// Close and stop tracking the job
    pub fn forget(&mut self) {
        self.close();
        self.job_id = None;
        self.attempts = 0;
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(cancel) = self.reader.take() {
            cancel.cancel();
        }
    }
}

/// Reader task body: open, forward messages, report how the stream ended
async fn read_stream(
    transport: Arc<dyn EventTransport>,
    job_id: String,
    token: Option<String>,
    generation: u64,
    tx: mpsc::UnboundedSender<TransportNotice>,
) {
    let send = |signal: TransportSignal| tx.send(TransportNotice { generation, signal }).is_ok();

    let mut stream = match transport.open(&job_id, token.as_deref()).await {
        Ok(stream) => stream,
        Err(e) => {
            send(TransportSignal::Failed(e.to_string()));
            return;
        }
    };
    if !send(TransportSignal::Opened) {
        return;
    }

    while let Some(item) = stream.next().await {
        let delivered = match item {
            Ok(raw) => send(TransportSignal::Message(raw)),
            Err(e) => {
                send(TransportSignal::Failed(e.to_string()));
                return;
            }
        };
        if !delivered {
            return;
        }
    }
    send(TransportSignal::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StaticToken;
    use crate::transport::EventStream;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Transport whose open() always fails, recording the token it saw
    struct RefusingTransport {
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl EventTransport for RefusingTransport {
        async fn open(&self, _job_id: &str, token: Option<&str>) -> ClientResult<EventStream> {
            self.seen.lock().unwrap().push(token.map(str::to_string));
            Err(ClientError::Transport("refused".to_string()))
        }
    }

    fn manager() -> (
        ConnectionManager,
        mpsc::UnboundedReceiver<TransportNotice>,
        Arc<RefusingTransport>,
    ) {
        let transport = Arc::new(RefusingTransport {
            seen: Mutex::new(Vec::new()),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(
            transport.clone(),
            Arc::new(StaticToken::new(Some("tok".to_string()))),
            ReconnectPolicy::default(),
            tx,
        );
        (manager, rx, transport)
    }

    #[tokio::test]
    async fn test_same_job_keeps_attempts() {
        let (mut manager, _rx, _) = manager();
        assert!(manager.begin("vid1"));
        manager.open().unwrap();
        manager.on_failure();
        manager.on_failure();
        assert_eq!(manager.attempts(), 2);

        assert!(!manager.begin("vid1"));
        assert_eq!(manager.attempts(), 2);

        assert!(manager.begin("vid2"));
        assert_eq!(manager.attempts(), 0);
    }

    #[tokio::test]
    async fn test_open_failure_reported_with_generation() {
        let (mut manager, mut rx, transport) = manager();
        manager.begin("vid1");
        manager.open().unwrap();

        let notice = rx.recv().await.unwrap();
        assert!(matches!(notice.signal, TransportSignal::Failed(_)));
        assert!(manager.accept(notice.generation));
        assert_eq!(
            transport.seen.lock().unwrap().as_slice(),
            &[Some("tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_closed_reader_signals_are_stale() {
        let (mut manager, mut rx, _) = manager();
        manager.begin("vid1");
        manager.open().unwrap();
        let first_generation = manager.generation;

        // Replace the reader before its signal is handled
        manager.open().unwrap();
        assert!(!manager.accept(first_generation));

        assert!(manager.close());
        assert!(!manager.close());
        while let Ok(notice) = rx.try_recv() {
            assert!(!manager.accept(notice.generation));
        }
    }

    #[tokio::test]
    async fn test_open_without_job_fails() {
        let (mut manager, _rx, _) = manager();
        assert!(matches!(manager.open(), Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_eleventh_failure_gives_up() {
        let (mut manager, _rx, _) = manager();
        manager.begin("vid1");
        for expected in 1..=10 {
            assert!(matches!(
                manager.on_failure(),
                ReconnectDecision::Retry { attempt, .. } if attempt == expected
            ));
        }
        assert_eq!(
            manager.on_failure(),
            ReconnectDecision::GiveUp { attempts: 11 }
        );
    }
}
