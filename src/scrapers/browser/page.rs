//! The page operations the product extractor drives.

use std::time::Duration;

use async_trait::async_trait;

use super::BrowserError;
use crate::config::SiteSelectors;

/// A live, rendered page that can be navigated, inspected and clicked.
///
/// Option positions are indices into the variant region's feature groups
/// and each group's options, in document order. Implementations re-query
/// the DOM for every call since clicks may re-render the region.
#[async_trait]
pub trait RenderedPage: Send {
    /// Navigate and wait for the document to become ready.
    async fn open(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Poll for `selector` until it exists or `timeout` elapses.
    /// Returns `Ok(false)` on timeout.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BrowserError>;

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String, BrowserError>;

    /// Move the pointer onto an option and click it.
    async fn click_option(
        &mut self,
        selectors: &SiteSelectors,
        feature: usize,
        option: usize,
    ) -> Result<(), BrowserError>;

    /// Visible label of an option.
    async fn option_label(
        &mut self,
        selectors: &SiteSelectors,
        feature: usize,
        option: usize,
    ) -> Result<String, BrowserError>;

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
