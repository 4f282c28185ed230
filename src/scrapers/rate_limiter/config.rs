//! Throttle tuning and reporting types.

use std::time::Duration;

use serde::Serialize;

/// Configuration for adaptive per-host throttling.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Delay between requests to the same host when nothing goes wrong.
    pub base_delay: Duration,
    /// Floor the delay never drops below.
    pub min_delay: Duration,
    /// Ceiling for backoff.
    pub max_delay: Duration,
    /// Applied to the delay on 429/503.
    pub backoff_multiplier: f64,
    /// Applied to the delay on other 5xx responses.
    pub server_error_multiplier: f64,
    /// Applied to the delay while recovering (< 1.0).
    pub recovery_multiplier: f64,
    /// Consecutive successes needed before each recovery step.
    pub recovery_threshold: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            server_error_multiplier: 1.5,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

/// Snapshot of one host's throttle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub current_delay: Duration,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
    pub server_errors: u64,
}
