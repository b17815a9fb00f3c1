//! Cancellable session timers
//!
//! Each timer is a spawned task that posts [`TimerFired`] to the client's
//! inbox. A timer is identified by kind plus a monotonically increasing id:
//! rescheduling or cancelling a kind invalidates the old id, and
//! [`SessionTimers::accept`] drops any notification whose id is no longer
//! current. A cancelled timer therefore never takes effect, even if its
//! notification was already queued when it was cancelled.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Timers owned by a processing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1-second elapsed-time tick (recurring)
    ElapsedTick,
    /// Delay before reopening the stream (one-shot)
    ReconnectDelay,
    /// Delay between `complete` and the review redirect (one-shot)
    CompletionRedirect,
    /// 1-second error countdown (recurring)
    ErrorCountdown,
}

impl TimerKind {
    fn is_recurring(&self) -> bool {
        matches!(self, TimerKind::ElapsedTick | TimerKind::ErrorCountdown)
    }
}

/// Notification posted when a timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub id: u64,
}

#[derive(Debug)]
struct ScheduledTimer {
    id: u64,
    cancel: CancellationToken,
}

/// Registry of live timers, at most one per kind
#[derive(Debug)]
pub struct SessionTimers {
    tx: mpsc::UnboundedSender<TimerFired>,
    live: HashMap<TimerKind, ScheduledTimer>,
    next_id: u64,
}

impl SessionTimers {
    pub fn new(tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            tx,
            live: HashMap::new(),
            next_id: 0,
        }
    }

    /// Fire once after `delay`, replacing any live timer of the same kind
    pub fn schedule_once(&mut self, kind: TimerKind, delay: Duration) {
        let (id, cancel) = self.register(kind);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(delay) => {
                    let _ = tx.send(TimerFired { kind, id });
                }
            }
        });
    }

    /// Fire every `period` (first after one period) until cancelled
    pub fn schedule_interval(&mut self, kind: TimerKind, period: Duration) {
        let (id, cancel) = self.register(kind);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(TimerFired { kind, id }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the live timer of `kind`; returns whether one existed
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.live.remove(&kind) {
            Some(timer) => {
                timer.cancel.cancel();
                trace!(?kind, id = timer.id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every live timer
    pub fn cancel_all(&mut self) {
        for (kind, timer) in self.live.drain() {
            timer.cancel.cancel();
            trace!(?kind, id = timer.id, "Timer cancelled");
        }
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.live.contains_key(&kind)
    }

    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    /// Validate a notification; one-shot timers retire when accepted
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        let current = matches!(self.live.get(&fired.kind), Some(timer) if timer.id == fired.id);
        if current && !fired.kind.is_recurring() {
            self.live.remove(&fired.kind);
        }
        current
    }

    fn register(&mut self, kind: TimerKind) -> (u64, CancellationToken) {
        self.cancel(kind);
        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        self.live.insert(
            kind,
            ScheduledTimer {
                id,
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = SessionTimers::new(tx);
        timers.schedule_once(TimerKind::CompletionRedirect, Duration::from_secs(2));

        tokio::time::advance(Duration::from_millis(1999)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let fired = rx.try_recv().expect("timer should fire at 2s");
        assert!(timers.accept(fired));
        assert!(!timers.is_active(TimerKind::CompletionRedirect));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = SessionTimers::new(tx);
        timers.schedule_interval(TimerKind::ElapsedTick, Duration::from_secs(1));

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
            let fired = rx.try_recv().expect("tick expected");
            assert!(timers.accept(fired));
        }
        assert!(timers.is_active(TimerKind::ElapsedTick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_silences_everything() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = SessionTimers::new(tx);
        timers.schedule_interval(TimerKind::ElapsedTick, Duration::from_secs(1));
        timers.schedule_once(TimerKind::ReconnectDelay, Duration::from_secs(1));
        timers.schedule_interval(TimerKind::ErrorCountdown, Duration::from_secs(1));
        timers.schedule_once(TimerKind::CompletionRedirect, Duration::from_secs(2));
        assert_eq!(timers.active_count(), 4);

        timers.cancel_all();
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        assert_eq!(timers.active_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_notification_rejected_after_reschedule() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = SessionTimers::new(tx);
        timers.schedule_once(TimerKind::ReconnectDelay, Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        let stale = rx.try_recv().expect("first timer fired");

        // Rescheduled before the queued notification was handled
        timers.schedule_once(TimerKind::ReconnectDelay, Duration::from_secs(5));
        assert!(!timers.accept(stale));
        assert!(timers.is_active(TimerKind::ReconnectDelay));
    }
}
