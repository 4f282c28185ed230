//! HTTP client with per-host throttling, retries and crawl gates.

mod user_agent;

pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::rate_limiter::RateLimiter;
use super::robots::RobotsPolicy;
use crate::config::{Settings, DEFAULT_RETRY_HTTP_CODES};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Disallowed by robots.txt: {0}")]
    Disallowed(String),

    #[error("Outside allowed domain: {0}")]
    OffDomain(String),

    #[error("Gave up on {url} after {attempts} attempts ({last})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Gate rejections are expected during a crawl and not worth a warning.
    pub fn is_gate(&self) -> bool {
        matches!(self, Self::Disallowed(_) | Self::OffDomain(_))
    }
}

/// Which failures are retried and how often.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retry_times: u32,
    pub retry_http_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_times: 3,
            retry_http_codes: DEFAULT_RETRY_HTTP_CODES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_http_codes.contains(&status)
    }

    /// Timeouts and connection failures are transient.
    pub fn retries_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

/// True when `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Shared crawl client. Clones share the connection pool, throttle state and
/// robots cache.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter,
    robots: Option<RobotsPolicy>,
    allowed_domain: Option<String>,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client with default throttling and no crawl gates.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::default(),
            robots: None,
            allowed_domain: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Create the crawl client described by the settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let client = Self::new(settings.request_timeout(), &settings.user_agent)?
            .with_rate_limiter(RateLimiter::new(settings.rate_limit_config()))
            .with_allowed_domain(&settings.allowed_domain)
            .with_retry(RetryPolicy {
                retry_times: settings.retry_times,
                retry_http_codes: settings.retry_http_codes.clone(),
            });

        Ok(if settings.obey_robots {
            let agent = resolve_user_agent(&settings.user_agent);
            client.with_robots(RobotsPolicy::new(&agent))
        } else {
            client
        })
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_robots(mut self, robots: RobotsPolicy) -> Self {
        self.robots = Some(robots);
        self
    }

    /// Empty domains disable the filter.
    pub fn with_allowed_domain(mut self, domain: &str) -> Self {
        let domain = domain.trim();
        self.allowed_domain = (!domain.is_empty()).then(|| domain.to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Apply the allowed-domain and robots.txt gates to a URL.
    pub async fn check_allowed(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        if let Some(ref domain) = self.allowed_domain {
            let on_domain = parsed
                .host_str()
                .map(|host| host_matches(host, domain))
                .unwrap_or(false);
            if !on_domain {
                return Err(FetchError::OffDomain(url.to_string()));
            }
        }

        if let Some(ref robots) = self.robots {
            if !robots.is_allowed(&self.client, &parsed).await {
                return Err(FetchError::Disallowed(url.to_string()));
            }
        }

        Ok(parsed)
    }

    /// GET a page and return its body, retrying transient failures.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.check_allowed(url).await?;

        let attempts = self.retry.retry_times + 1;
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            let host = self.rate_limiter.acquire(url).await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if let Some(ref host) = host {
                        self.report_status(host, status.as_u16()).await;
                    }

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) if RetryPolicy::retries_error(&e) => {
                                last_failure = e.to_string();
                            }
                            Err(e) => return Err(e.into()),
                        }
                    } else if self.retry.retries_status(status.as_u16()) {
                        last_failure = format!("HTTP {}", status.as_u16());
                    } else {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) if RetryPolicy::retries_error(&e) => {
                    last_failure = e.to_string();
                }
                Err(e) => return Err(e.into()),
            }

            if attempt < attempts {
                debug!(
                    "Retrying {} (attempt {}/{}): {}",
                    url,
                    attempt + 1,
                    attempts,
                    last_failure
                );
            }
        }

        warn!("Giving up on {} after {} attempts", url, attempts);
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last: last_failure,
        })
    }

    async fn report_status(&self, host: &str, status: u16) {
        if RateLimiter::is_rate_limit(status) {
            self.rate_limiter.report_rate_limit(host, status).await;
        } else if status >= 500 {
            self.rate_limiter.report_server_error(host).await;
        } else if (200..400).contains(&status) {
            self.rate_limiter.report_success(host).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::rate_limiter::RateLimitConfig;
    use crate::scrapers::test_server::{Reply, TestServer};

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(5), "")
            .unwrap()
            .with_rate_limiter(RateLimiter::new(RateLimitConfig {
                base_delay: Duration::from_millis(1),
                min_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                ..Default::default()
            }))
    }

    #[test]
    fn host_matching_includes_subdomains() {
        assert!(host_matches("rangdongstore.vn", "rangdongstore.vn"));
        assert!(host_matches("www.RangDongStore.vn", "rangdongstore.vn"));
        assert!(!host_matches("evilrangdongstore.vn", "rangdongstore.vn"));
        assert!(!host_matches("rangdongstore.vn.example", "rangdongstore.vn"));
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = TestServer::start().await;
        server.route("/page", vec![Reply::ok("hello")]);

        let body = client().get_text(&server.url("/page")).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let server = TestServer::start().await;
        server.route("/flaky", vec![Reply::status(503), Reply::ok("done")]);

        let body = client().get_text(&server.url("/flaky")).await.unwrap();
        assert_eq!(body, "done");
        assert_eq!(server.hits("/flaky"), 2);
    }

    #[tokio::test]
    async fn stops_after_retry_budget() {
        let server = TestServer::start().await;
        server.route("/down", vec![Reply::status(502)]);

        let client = client().with_retry(RetryPolicy {
            retry_times: 2,
            ..Default::default()
        });
        let err = client.get_text(&server.url("/down")).await.unwrap_err();
        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(server.hits("/down"), 3);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let server = TestServer::start().await;
        let err = client().get_text(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(server.hits("/missing"), 1);
    }

    #[tokio::test]
    async fn off_domain_urls_are_not_fetched() {
        let server = TestServer::start().await;
        server.route("/page", vec![Reply::ok("hello")]);

        let client = client().with_allowed_domain("rangdongstore.vn");
        let err = client.get_text(&server.url("/page")).await.unwrap_err();
        assert!(matches!(err, FetchError::OffDomain(_)));
        assert!(err.is_gate());
        assert_eq!(server.hits("/page"), 0);
    }

    #[tokio::test]
    async fn robots_disallow_blocks_fetch() {
        let server = TestServer::start().await;
        server.route("/robots.txt", vec![Reply::ok("User-agent: *\nDisallow: /cart\n")]);
        server.route("/cart", vec![Reply::ok("secret")]);
        server.route("/den-p-1", vec![Reply::ok("product")]);

        let client = client().with_robots(RobotsPolicy::new(USER_AGENT));
        let err = client.get_text(&server.url("/cart")).await.unwrap_err();
        assert!(matches!(err, FetchError::Disallowed(_)));
        assert_eq!(server.hits("/cart"), 0);

        assert_eq!(client.get_text(&server.url("/den-p-1")).await.unwrap(), "product");
        assert_eq!(server.hits("/robots.txt"), 1);
    }

    #[tokio::test]
    async fn missing_robots_allows_everything() {
        let server = TestServer::start().await;
        server.route("/den-p-1", vec![Reply::ok("product")]);

        let client = client().with_robots(RobotsPolicy::new(USER_AGENT));
        assert_eq!(client.get_text(&server.url("/den-p-1")).await.unwrap(), "product");
    }
}
