//! Per-host throttle state.

use std::time::{Duration, Instant};

use super::config::{HostStats, RateLimitConfig};

/// What a response did to the host's delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayChange {
    Unchanged,
    Increased,
    Reduced,
    Recovered,
}

#[derive(Debug, Clone)]
pub struct HostState {
    pub current_delay: Duration,
    /// Earliest instant the next request may start.
    pub next_slot: Option<Instant>,
    pub consecutive_successes: u32,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
    pub server_errors: u64,
}

impl HostState {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            next_slot: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
            server_errors: 0,
        }
    }

    /// Claim the next request slot and return how long the caller must wait.
    ///
    /// Slots are spaced by the current delay, so concurrent callers queue up
    /// behind each other instead of all seeing an idle host.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let start = match self.next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        self.next_slot = Some(start + self.current_delay);
        self.total_requests += 1;
        start - now
    }

    pub fn on_success(&mut self, config: &RateLimitConfig) -> DelayChange {
        self.consecutive_successes += 1;
        if !self.in_backoff || self.consecutive_successes < config.recovery_threshold {
            return DelayChange::Unchanged;
        }

        self.consecutive_successes = 0;
        let reduced = self.current_delay.mul_f64(config.recovery_multiplier);
        self.current_delay = reduced.max(config.min_delay);

        if self.current_delay <= config.base_delay {
            self.current_delay = config.base_delay;
            self.in_backoff = false;
            DelayChange::Recovered
        } else {
            DelayChange::Reduced
        }
    }

    pub fn on_rate_limit(&mut self, config: &RateLimitConfig) -> DelayChange {
        self.rate_limit_hits += 1;
        self.in_backoff = true;
        self.grow(config.backoff_multiplier, config)
    }

    pub fn on_server_error(&mut self, config: &RateLimitConfig) -> DelayChange {
        self.server_errors += 1;
        self.in_backoff = true;
        self.grow(config.server_error_multiplier, config)
    }

    fn grow(&mut self, multiplier: f64, config: &RateLimitConfig) -> DelayChange {
        self.consecutive_successes = 0;
        let before = self.current_delay;
        self.current_delay = before.mul_f64(multiplier).min(config.max_delay);
        if self.current_delay > before {
            DelayChange::Increased
        } else {
            DelayChange::Unchanged
        }
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            current_delay: self.current_delay,
            in_backoff: self.in_backoff,
            total_requests: self.total_requests,
            rate_limit_hits: self.rate_limit_hits,
            server_errors: self.server_errors,
        }
    }
}
