//! Processing event-stream client
//!
//! [`ProcessingClient`] is a cheap handle to a single background task that
//! owns all session state. Everything that can change that state arrives at
//! the task as a message and is handled to completion before the next one:
//!
//! - control commands (`connect`, `disconnect`, `reset`, ...) from handles
//! - [`TransportNotice`]s from the stream reader
//! - [`TimerFired`] notifications from session timers
//! - violation prefetch results
//!
//! After each message the full [`ProcessingState`] is published on a
//! `watch` channel. Control calls return once the task has applied them, so
//! a caller that awaits `disconnect()` observes the post-disconnect state.

use crate::collaborators::{Navigator, TokenProvider, ViolationsApi};
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, TransportNotice, TransportSignal};
use crate::dispatcher::{self, Effect};
use crate::error::{ClientError, ClientResult};
use crate::live_updates::UpdateCategory;
use crate::prefetch::{HttpViolationsApi, ViolationPage};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::side_effects::SideEffectController;
use crate::state::ProcessingState;
use crate::timers::{SessionTimers, TimerFired, TimerKind};
use crate::timing::TimingTracker;
use crate::transport::{EventTransport, RawEvent, SseTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use vidshield_common::Phase;

const COMMAND_CHANNEL_SIZE: usize = 32;
const ELAPSED_TICK: Duration = Duration::from_secs(1);

/// Message shown when the reconnect budget runs out
pub const CONNECTION_LOST_MESSAGE: &str =
    "Could not connect to the processing server. Please check your connection.";

/// External services the client drives
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn EventTransport>,
    pub violations: Arc<dyn ViolationsApi>,
    pub navigator: Arc<dyn Navigator>,
    pub tokens: Arc<dyn TokenProvider>,
}

impl Collaborators {
    /// SSE transport and HTTP violations API sharing one reqwest client
    pub fn http(
        config: &ClientConfig,
        navigator: Arc<dyn Navigator>,
        tokens: Arc<dyn TokenProvider>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vidshield-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            transport: Arc::new(SseTransport::new(http.clone(), &config.api_base_url)),
            violations: Arc::new(HttpViolationsApi::new(
                http,
                &config.api_base_url,
                Arc::clone(&tokens),
                config.prefetch.clone(),
            )),
            navigator,
            tokens,
        })
    }
}

enum Command {
    Connect {
        job_id: String,
        ack: oneshot::Sender<()>,
    },
    Disconnect {
        ack: oneshot::Sender<()>,
    },
    Reset {
        ack: oneshot::Sender<()>,
    },
    RetryViolations {
        ack: oneshot::Sender<bool>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

struct PrefetchOutcome {
    epoch: u64,
    result: Result<ViolationPage, String>,
}

/// Handle to the processing client task
#[derive(Clone)]
pub struct ProcessingClient {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ProcessingState>,
}

impl ProcessingClient {
    /// Start the client task
    ///
    /// Must be called from within a tokio runtime. The task ends on
    /// [`shutdown`](Self::shutdown) or when every handle has been dropped.
    pub fn spawn(config: ClientConfig, collaborators: Collaborators) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (prefetch_tx, prefetch_rx) = mpsc::unbounded_channel();
        let (publisher, state) = watch::channel(ProcessingState::default());

        let task = ClientTask {
            state: ProcessingState::default(),
            timing: TimingTracker::default(),
            connection: ConnectionManager::new(
                collaborators.transport,
                collaborators.tokens,
                ReconnectPolicy::from_config(&config.reconnect),
                transport_tx,
            ),
            timers: SessionTimers::new(timer_tx),
            side_effects: SideEffectController::new(config.redirect.clone()),
            violations: collaborators.violations,
            navigator: collaborators.navigator,
            publisher,
            prefetch_tx,
            prefetch_epoch: 0,
        };
        tokio::spawn(task.run(command_rx, transport_rx, timer_rx, prefetch_rx));

        Self {
            commands: command_tx,
            state,
        }
    }

    /// Follow `job_id`
    ///
    /// A job other than the tracked one starts a fresh session; the tracked
    /// job again is a reconnection that keeps session state and counters.
    pub async fn connect(&self, job_id: impl Into<String>) -> ClientResult<()> {
        let job_id = job_id.into();
        self.request(|ack| Command::Connect { job_id, ack }).await
    }

    /// Close the stream and cancel every session timer (idempotent)
    pub async fn disconnect(&self) -> ClientResult<()> {
        self.request(|ack| Command::Disconnect { ack }).await
    }

    /// Disconnect and return all state to defaults
    pub async fn reset(&self) -> ClientResult<()> {
        self.request(|ack| Command::Reset { ack }).await
    }

    /// Re-issue a failed violation prefetch
    ///
    /// # Returns
    /// * `Ok(true)` - a new request was started
    /// * `Ok(false)` - nothing to retry (not failed, in flight, or not in review)
    pub async fn retry_violations(&self) -> ClientResult<bool> {
        self.request(|ack| Command::RetryViolations { ack }).await
    }

    /// Cancel everything and end the client task
    pub async fn shutdown(&self) -> ClientResult<()> {
        self.request(|ack| Command::Shutdown { ack }).await
    }

    /// Receiver that sees every published state
    pub fn subscribe(&self) -> watch::Receiver<ProcessingState> {
        self.state.clone()
    }

    /// Latest published state
    pub fn state(&self) -> ProcessingState {
        self.state.borrow().clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> ClientResult<T> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(command(ack))
            .await
            .map_err(|_| ClientError::Stopped)?;
        done.await.map_err(|_| ClientError::Stopped)
    }
}

struct ClientTask {
    state: ProcessingState,
    timing: TimingTracker,
    connection: ConnectionManager,
    timers: SessionTimers,
    side_effects: SideEffectController,
    violations: Arc<dyn ViolationsApi>,
    navigator: Arc<dyn Navigator>,
    publisher: watch::Sender<ProcessingState>,
    prefetch_tx: mpsc::UnboundedSender<PrefetchOutcome>,
    /// Bumped whenever in-flight prefetch results must be discarded
    prefetch_epoch: u64,
}

impl ClientTask {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut transport_rx: mpsc::UnboundedReceiver<TransportNotice>,
        mut timer_rx: mpsc::UnboundedReceiver<TimerFired>,
        mut prefetch_rx: mpsc::UnboundedReceiver<PrefetchOutcome>,
    ) {
        debug!("Processing client started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown { ack }) => {
                        self.teardown();
                        self.publish();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some(notice) = transport_rx.recv() => {
                    self.handle_transport(notice);
                    self.publish();
                }
                Some(fired) = timer_rx.recv() => {
                    self.handle_timer(fired);
                    self.publish();
                }
                Some(outcome) = prefetch_rx.recv() => {
                    self.handle_prefetch(outcome);
                    self.publish();
                }
            }
        }

        debug!("Processing client stopped");
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    // ========================================================================
    // Control commands
    // ========================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { job_id, ack } => {
                self.connect(job_id);
                self.publish();
                let _ = ack.send(());
            }
            Command::Disconnect { ack } => {
                self.disconnect();
                self.publish();
                let _ = ack.send(());
            }
            Command::Reset { ack } => {
                self.reset();
                self.publish();
                let _ = ack.send(());
            }
            Command::RetryViolations { ack } => {
                let started = self.retry_violations();
                self.publish();
                let _ = ack.send(started);
            }
            Command::Shutdown { ack } => {
                // Handled by the run loop
                let _ = ack.send(());
            }
        }
    }

    fn connect(&mut self, job_id: String) {
        // A finished session is not resumed: following its job again starts over
        if self.state.session.is_terminal() {
            self.connection.forget();
        }

        if self.connection.begin(&job_id) {
            self.timers.cancel_all();
            self.prefetch_epoch += 1;
            self.state = ProcessingState::for_job(&job_id);
            self.timing.start();
            self.state.session.started_at = self.timing.started_at();
            self.timers
                .schedule_interval(TimerKind::ElapsedTick, ELAPSED_TICK);
            info!(
                job_id = %job_id,
                session_id = %self.state.session.session_id,
                "Following processing job"
            );
        } else {
            self.timers.cancel(TimerKind::ReconnectDelay);
            if self.timing.is_started() && !self.timers.is_active(TimerKind::ElapsedTick) {
                self.timers
                    .schedule_interval(TimerKind::ElapsedTick, ELAPSED_TICK);
            }
            info!(
                job_id = %job_id,
                attempt = self.connection.attempts(),
                "Reconnecting to processing job"
            );
        }

        self.open_stream();
    }

    fn disconnect(&mut self) {
        let was_open = self.connection.close();
        self.timers.cancel_all();
        self.abandon_prefetch();
        self.state.session.connected = false;
        if self.timing.is_started() {
            self.state.session.elapsed_seconds = self.timing.elapsed_seconds();
        }
        if was_open {
            info!(
                session_id = %self.state.session.session_id,
                "Disconnected from processing stream"
            );
        }
    }

    fn reset(&mut self) {
        self.connection.forget();
        self.timers.cancel_all();
        self.timing.reset();
        self.prefetch_epoch += 1;
        self.state = ProcessingState::default();
        debug!("Processing client reset");
    }

    fn retry_violations(&mut self) -> bool {
        let violations = &self.state.violations;
        if !violations.can_retry() || self.state.session.phase != Phase::WaitingForReview {
            return false;
        }
        self.state.violations.begin();
        self.start_prefetch();
        true
    }

    fn teardown(&mut self) {
        self.connection.forget();
        self.timers.cancel_all();
        self.prefetch_epoch += 1;
        self.state.session.connected = false;
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn open_stream(&mut self) {
        if let Err(e) = self.connection.open() {
            error!(error = %e, "Cannot open processing stream");
        }
    }

    fn handle_transport(&mut self, notice: TransportNotice) {
        if !self.connection.accept(notice.generation) {
            debug!(generation = notice.generation, "Dropping stale transport signal");
            return;
        }

        match notice.signal {
            TransportSignal::Opened => {
                self.connection.on_opened();
                self.state.session.connected = true;
                self.state.session.reconnect_attempts = 0;
                self.state
                    .live_updates
                    .add("Connected to processing server", UpdateCategory::Connection);
                info!(
                    job_id = self.connection.job_id().unwrap_or("-"),
                    "Processing stream connected"
                );
            }
            TransportSignal::Message(raw) => self.handle_message(raw),
            TransportSignal::Failed(reason) => self.handle_stream_loss(reason),
            TransportSignal::Closed => {
                self.handle_stream_loss("Stream ended by server".to_string())
            }
        }
    }

    fn handle_stream_loss(&mut self, reason: String) {
        self.state.session.connected = false;

        if self.state.session.is_terminal() {
            self.connection.close();
            debug!(reason = %reason, "Stream ended after terminal event");
            return;
        }

        match self.connection.on_failure() {
            ReconnectDecision::Retry { attempt, delay } => {
                self.state.session.reconnect_attempts = attempt;
                warn!(
                    job_id = self.connection.job_id().unwrap_or("-"),
                    attempt,
                    max_attempts = self.connection.policy().max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Stream lost, reconnecting"
                );
                self.state.live_updates.add(
                    format!(
                        "Connection lost, retrying ({}/{})",
                        attempt,
                        self.connection.policy().max_attempts
                    ),
                    UpdateCategory::Connection,
                );
                self.timers.schedule_once(TimerKind::ReconnectDelay, delay);
            }
            ReconnectDecision::GiveUp { attempts } => {
                self.state.session.reconnect_attempts = attempts;
                error!(
                    job_id = self.connection.job_id().unwrap_or("-"),
                    attempts,
                    reason = %reason,
                    "Giving up on processing stream"
                );
                self.state.session.mark_connection_lost(CONNECTION_LOST_MESSAGE);
                self.state
                    .live_updates
                    .add(CONNECTION_LOST_MESSAGE, UpdateCategory::Error);
                self.stop_elapsed();
                self.timers.cancel(TimerKind::ReconnectDelay);
            }
        }
    }

    fn handle_message(&mut self, raw: RawEvent) {
        let event = match dispatcher::decode(&raw) {
            Ok(event) => event,
            Err(e) => {
                self.state.session.dropped_events += 1;
                warn!(
                    event_type = %raw.event,
                    dropped = self.state.session.dropped_events,
                    error = %e,
                    "Dropping malformed stream message"
                );
                return;
            }
        };

        debug!(event_type = event.event_type(), "Stream event");
        for effect in dispatcher::dispatch(&mut self.state, event) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::RebaseElapsed(seconds) => {
                if self.timing.rebase(seconds) {
                    self.state.session.started_at = self.timing.started_at();
                    self.state.session.elapsed_seconds = self.timing.elapsed_seconds();
                }
            }
            Effect::PrefetchViolations => self.start_prefetch(),
            Effect::StopElapsedTimer => self.stop_elapsed(),
            Effect::CloseStream => {
                self.connection.close();
                self.timers.cancel(TimerKind::ReconnectDelay);
                self.state.session.connected = false;
            }
            Effect::ScheduleRedirect => self
                .side_effects
                .on_complete(&mut self.state.session, &mut self.timers),
            Effect::StartErrorCountdown => {
                if let Some(route) = self
                    .side_effects
                    .on_error(&mut self.state.session, &mut self.timers)
                {
                    self.navigate(&route);
                }
            }
        }
    }

    fn stop_elapsed(&mut self) {
        self.timers.cancel(TimerKind::ElapsedTick);
        if self.timing.is_started() {
            self.state.session.elapsed_seconds = self.timing.elapsed_seconds();
        }
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn handle_timer(&mut self, fired: TimerFired) {
        if !self.timers.accept(fired) {
            debug!(kind = ?fired.kind, id = fired.id, "Dropping stale timer");
            return;
        }

        match fired.kind {
            TimerKind::ElapsedTick => {
                self.state.session.elapsed_seconds = self.timing.elapsed_seconds();
            }
            TimerKind::ReconnectDelay => {
                info!(
                    job_id = self.connection.job_id().unwrap_or("-"),
                    attempt = self.connection.attempts(),
                    "Reopening processing stream"
                );
                self.open_stream();
            }
            TimerKind::CompletionRedirect | TimerKind::ErrorCountdown => {
                let route = self.side_effects.on_timer(
                    fired.kind,
                    &mut self.state.session,
                    &mut self.timers,
                );
                if let Some(route) = route {
                    if fired.kind == TimerKind::CompletionRedirect {
                        self.connection.close();
                        self.state.session.connected = false;
                    }
                    self.navigate(&route);
                }
            }
        }
    }

    fn navigate(&self, route: &str) {
        info!(
            session_id = %self.state.session.session_id,
            route,
            "Redirecting"
        );
        self.navigator.navigate(route);
    }

    // ========================================================================
    // Violation prefetch
    // ========================================================================

    fn start_prefetch(&mut self) {
        let Some(job_id) = self.state.session.video_id.clone() else {
            self.state
                .violations
                .finish(Err("No job to fetch violations for".to_string()));
            return;
        };

        info!(job_id = %job_id, "Prefetching violations for review");
        let api = Arc::clone(&self.violations);
        let tx = self.prefetch_tx.clone();
        let epoch = self.prefetch_epoch;

        tokio::spawn(async move {
            let result = api
                .list_violations(&job_id)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(PrefetchOutcome { epoch, result });
        });
    }

    fn handle_prefetch(&mut self, outcome: PrefetchOutcome) {
        if outcome.epoch != self.prefetch_epoch {
            debug!("Dropping prefetch result from an earlier session");
            return;
        }

        match &outcome.result {
            Ok(page) => info!(items = page.items.len(), total = page.total, "Violations prefetched"),
            Err(e) => warn!(error = %e, "Violation prefetch failed"),
        }
        self.state.violations.finish(outcome.result);
    }

    /// Forget an in-flight prefetch; the gate reopens for the next connect
    fn abandon_prefetch(&mut self) {
        self.prefetch_epoch += 1;
        if self.state.violations.loading {
            self.state.violations.loading = false;
            self.state.violations.fetched = false;
        }
    }
}
