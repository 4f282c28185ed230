//! Rendered product pages.
//!
//! The extractor talks to [`RenderedPage`]; [`BrowserSession`] implements it
//! on chromiumoxide (CDP) when the `browser` feature is enabled.

mod config;
mod page;
#[cfg(feature = "browser")]
mod session;
#[cfg(feature = "browser")]
mod stealth;

use std::time::Duration;

use thiserror::Error;

pub use config::BrowserEngineConfig;
pub use page::RenderedPage;
#[cfg(feature = "browser")]
pub use session::BrowserSession;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser support unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to start browser: {0}")]
    Launch(String),

    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("DevTools protocol error: {0}")]
    Protocol(String),
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
mod stub {
    use async_trait::async_trait;

    use super::{BrowserEngineConfig, BrowserError, RenderedPage};
    use crate::config::SiteSelectors;

    fn unavailable() -> BrowserError {
        BrowserError::Unavailable(
            "browser support not compiled; rebuild with --features browser".to_string(),
        )
    }

    pub struct BrowserSession;

    impl BrowserSession {
        pub async fn launch(_config: BrowserEngineConfig) -> Result<Self, BrowserError> {
            Err(unavailable())
        }

        pub async fn close(self) {}
    }

    #[async_trait]
    impl RenderedPage for BrowserSession {
        async fn open(&mut self, _url: &str) -> Result<(), BrowserError> {
            Err(unavailable())
        }

        async fn wait_for(
            &mut self,
            _selector: &str,
            _timeout: std::time::Duration,
        ) -> Result<bool, BrowserError> {
            Err(unavailable())
        }

        async fn content(&mut self) -> Result<String, BrowserError> {
            Err(unavailable())
        }

        async fn click_option(
            &mut self,
            _selectors: &SiteSelectors,
            _feature: usize,
            _option: usize,
        ) -> Result<(), BrowserError> {
            Err(unavailable())
        }

        async fn option_label(
            &mut self,
            _selectors: &SiteSelectors,
            _feature: usize,
            _option: usize,
        ) -> Result<String, BrowserError> {
            Err(unavailable())
        }
    }
}

#[cfg(not(feature = "browser"))]
pub use stub::BrowserSession;
