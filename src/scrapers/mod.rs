//! Fetching layer: throttled HTTP, robots.txt, sitemaps and rendered pages.

pub mod browser;
pub mod http_client;
pub mod rate_limiter;
pub mod robots;
pub mod selector;
pub mod sitemap;
#[cfg(test)]
pub(crate) mod test_server;

pub use browser::{BrowserEngineConfig, BrowserError, BrowserSession, RenderedPage};
pub use http_client::{FetchError, HttpClient, RetryPolicy};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use robots::RobotsPolicy;
pub use selector::{parse_selector, SelectorError};
pub use sitemap::SitemapError;
