//! Completion / error side-effect controller
//!
//! Owns the two redirect timers:
//! - **Completion:** one-shot, fires `completion_delay` after `complete` and
//!   navigates to the session's redirect URL (the review route when the
//!   server sent none).
//! - **Error:** recurring 1-second countdown starting at
//!   `error_countdown_seconds`; navigates to the fallback route at zero.
//!
//! Both are ordinary [`SessionTimers`] entries, so `disconnect()`/`reset()`
//! cancel them with everything else.

use crate::config::RedirectConfig;
use crate::session::ProcessingSession;
use crate::timers::{SessionTimers, TimerKind};
use std::time::Duration;
use tracing::{debug, info};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

pub struct SideEffectController {
    config: RedirectConfig,
}

impl SideEffectController {
    pub fn new(config: RedirectConfig) -> Self {
        Self { config }
    }

    /// Arm the completion redirect
    pub fn on_complete(&self, session: &mut ProcessingSession, timers: &mut SessionTimers) {
        if session.redirect_url.is_none() {
            session.redirect_url = session
                .video_id
                .as_deref()
                .map(|video_id| self.config.review_route(video_id));
        }

        let delay = self.config.completion_delay();
        info!(
            redirect = session.redirect_url.as_deref().unwrap_or("-"),
            delay_ms = delay.as_millis() as u64,
            "Completion redirect scheduled"
        );
        timers.schedule_once(TimerKind::CompletionRedirect, delay);
    }

    /// Start the error countdown
    ///
    /// # Returns
    /// The fallback route when the countdown is configured as zero, meaning
    /// the redirect is due immediately.
    pub fn on_error(
        &self,
        session: &mut ProcessingSession,
        timers: &mut SessionTimers,
    ) -> Option<String> {
        let seconds = self.config.error_countdown_seconds;
        session.redirect_countdown = Some(seconds);
        if seconds == 0 {
            return Some(self.config.error_fallback_route.clone());
        }

        info!(seconds, route = %self.config.error_fallback_route, "Error countdown started");
        timers.schedule_interval(TimerKind::ErrorCountdown, COUNTDOWN_PERIOD);
        None
    }

    /// Advance a redirect timer that fired
    ///
    /// # Returns
    /// The route to navigate to, if this firing completes a redirect.
    pub fn on_timer(
        &self,
        kind: TimerKind,
        session: &mut ProcessingSession,
        timers: &mut SessionTimers,
    ) -> Option<String> {
        match kind {
            TimerKind::CompletionRedirect => session.redirect_url.clone(),
            TimerKind::ErrorCountdown => {
                let remaining = session.redirect_countdown.unwrap_or(0).saturating_sub(1);
                session.redirect_countdown = Some(remaining);
                debug!(remaining, "Error countdown");

                if remaining == 0 {
                    timers.cancel(TimerKind::ErrorCountdown);
                    Some(self.config.error_fallback_route.clone())
                } else {
                    None
                }
            }
            TimerKind::ElapsedTick | TimerKind::ReconnectDelay => None,
        }
    }
}
