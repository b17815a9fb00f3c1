//! Stream reconnection policy
//!
//! Bounded retry with a growing, capped delay between attempts.
//!
//! **Algorithm** (on each transport failure):
//! 1. `delay = min(base_delay + attempts * step, max_delay)` using the
//!    attempt count *before* this failure
//! 2. Increment `attempts`
//! 3. If `attempts > max_attempts`: give up (fatal, no further retries)
//! 4. Otherwise: retry after `delay`
//!
//! A successful open resets `attempts` to 0, so the bound applies to
//! consecutive failures only.

use crate::config::ReconnectConfig;
use std::time::Duration;

/// Outcome of a transport failure under the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reopen the stream after `delay`; `attempt` is the new attempt count
    Retry { attempt: u32, delay: Duration },
    /// Retry budget exhausted after `attempts` consecutive failures
    GiveUp { attempts: u32 },
}

/// Backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub step: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            step: Duration::from_millis(config.step_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
        }
    }

    /// Delay before the retry that follows `attempts` earlier failures
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let grown = self
            .step
            .checked_mul(attempts)
            .and_then(|extra| self.base_delay.checked_add(extra))
            .unwrap_or(self.max_delay);
        grown.min(self.max_delay)
    }

    /// Decide what to do after a failure, given the attempt count so far
    pub fn on_failure(&self, attempts: u32) -> ReconnectDecision {
        let delay = self.delay_for(attempts);
        let attempt = attempts.saturating_add(1);

        if attempt > self.max_attempts {
            ReconnectDecision::GiveUp { attempts: attempt }
        } else {
            ReconnectDecision::Retry { attempt, delay }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}
