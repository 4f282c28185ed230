//! Adaptive per-host rate limiter.
//!
//! Spaces requests to the same host by a delay that grows on 429/503 and
//! other server errors and shrinks back after a run of successes.

mod config;
mod domain_state;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub use config::{HostStats, RateLimitConfig};
use domain_state::{DelayChange, HostState};

/// Adaptive rate limiter keyed by URL host. Clones share state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hosts: Arc<Mutex<HashMap<String, HostState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hosts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Extract the host from a URL.
    pub fn extract_host(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|s| s.to_ascii_lowercase()))
    }

    /// Wait for this host's next free slot. Returns the host, or `None` for
    /// URLs without one (those are not throttled).
    pub async fn acquire(&self, url: &str) -> Option<String> {
        let host = Self::extract_host(url)?;

        let wait = {
            let mut hosts = self.hosts.lock().await;
            hosts
                .entry(host.clone())
                .or_insert_with(|| HostState::new(self.config.base_delay))
                .reserve(Instant::now())
        };

        if !wait.is_zero() {
            debug!("Throttling {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }

        Some(host)
    }

    pub async fn report_success(&self, host: &str) {
        let mut hosts = self.hosts.lock().await;
        if let Some(state) = hosts.get_mut(host) {
            match state.on_success(&self.config) {
                DelayChange::Recovered => info!("Host {} recovered from backoff", host),
                DelayChange::Reduced => {
                    debug!("Host {} delay reduced to {:?}", host, state.current_delay)
                }
                _ => {}
            }
        }
    }

    /// 429 and 503 are definite rate limit signals.
    pub fn is_rate_limit(status: u16) -> bool {
        matches!(status, 429 | 503)
    }

    pub async fn report_rate_limit(&self, host: &str, status: u16) {
        let mut hosts = self.hosts.lock().await;
        if let Some(state) = hosts.get_mut(host) {
            state.on_rate_limit(&self.config);
            warn!(
                "Rate limited by {} (HTTP {}), backing off to {:?}",
                host, status, state.current_delay
            );
        }
    }

    pub async fn report_server_error(&self, host: &str) {
        let mut hosts = self.hosts.lock().await;
        if let Some(state) = hosts.get_mut(host) {
            if state.on_server_error(&self.config) == DelayChange::Increased {
                debug!(
                    "Server error for {}, delay increased to {:?}",
                    host, state.current_delay
                );
            }
        }
    }

    pub async fn stats(&self) -> HashMap<String, HostStats> {
        let hosts = self.hosts.lock().await;
        hosts.iter().map(|(k, v)| (k.clone(), v.stats())).collect()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            ..Default::default()
        })
    }

    #[test]
    fn extract_host_lowercases() {
        assert_eq!(
            RateLimiter::extract_host("https://RangDongStore.vn/a-p-1"),
            Some("rangdongstore.vn".to_string())
        );
        assert_eq!(RateLimiter::extract_host("not a url"), None);
    }

    #[tokio::test]
    async fn backoff_on_rate_limit() {
        let limiter = fast();
        let host = limiter.acquire("https://example.com/1").await.unwrap();
        limiter.report_rate_limit(&host, 429).await;

        let stats = limiter.stats().await;
        let host_stats = &stats["example.com"];
        assert!(host_stats.in_backoff);
        assert_eq!(host_stats.current_delay, Duration::from_millis(20));
        assert_eq!(host_stats.rate_limit_hits, 1);
    }

    #[tokio::test]
    async fn second_request_waits_for_delay() {
        let limiter = fast();
        let start = Instant::now();
        limiter.acquire("https://example.com/1").await;
        limiter.acquire("https://example.com/2").await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn hosts_are_independent() {
        let limiter = fast();
        limiter.acquire("https://a.example/1").await;
        let host = limiter.acquire("https://b.example/1").await.unwrap();
        limiter.report_server_error(&host).await;

        let stats = limiter.stats().await;
        assert!(!stats["a.example"].in_backoff);
        assert_eq!(stats["b.example"].server_errors, 1);
    }
}
