//! Product extraction from rendered pages.
//!
//! Each URL yields one base record from the page's structured data and
//! breadcrumbs, then one record per variant combination reachable by
//! clicking through the variant options.

mod features;
mod structured;
mod walker;

pub use features::{feature_groups, PageSelectors};
pub use structured::{parse_breadcrumbs, parse_product, Categories, StructuredDataError};
pub use walker::{VariantWalker, WalkStep};

use std::time::Duration;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{Settings, SiteSelectors};
use crate::models::{ProductRecord, VariantFeature};
use crate::scrapers::{BrowserError, FetchError, HttpClient, RenderedPage, SelectorError};

/// Receives every record the extractor emits.
pub trait RecordSink {
    fn accept(&mut self, record: ProductRecord);
}

impl RecordSink for Vec<ProductRecord> {
    fn accept(&mut self, record: ProductRecord) {
        self.push(record);
    }
}

/// Why a page produced nothing.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    Skipped(#[from] FetchError),

    #[error("{0}")]
    Browser(#[from] BrowserError),
}

/// Waits and pauses applied while driving a page.
#[derive(Debug, Clone)]
pub struct ExtractTimings {
    pub render_wait: Duration,
    pub marker_timeout: Duration,
    pub variant_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for ExtractTimings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ExtractTimings {
    fn from(settings: &Settings) -> Self {
        Self {
            render_wait: settings.render_wait(),
            marker_timeout: settings.marker_timeout(),
            variant_timeout: settings.variant_timeout(),
            settle_delay: settings.settle_delay(),
        }
    }
}

/// What one URL produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageOutcome {
    pub url: String,
    pub base_emitted: bool,
    /// Combinations the page offered.
    pub variants_expected: usize,
    pub variants_emitted: usize,
    /// Enumeration stopped early after a failure.
    pub variants_cut_short: bool,
}

/// Totals over an extract run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub pages: u64,
    pub base_records: u64,
    pub variant_records: u64,
    pub variant_walks_cut_short: u64,
    /// Pages skipped or failed.
    pub errors: u64,
}

impl ExtractStats {
    fn record(&mut self, outcome: &PageOutcome) {
        self.pages += 1;
        self.base_records += u64::from(outcome.base_emitted);
        self.variant_records += outcome.variants_emitted as u64;
        self.variant_walks_cut_short += u64::from(outcome.variants_cut_short);
    }
}

/// Drives a [`RenderedPage`] through product pages.
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    selectors: SiteSelectors,
    compiled: PageSelectors,
    timings: ExtractTimings,
}

impl ProductExtractor {
    pub fn new(selectors: SiteSelectors, timings: ExtractTimings) -> Result<Self, SelectorError> {
        let compiled = PageSelectors::compile(&selectors)?;
        Ok(Self {
            selectors,
            compiled,
            timings,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SelectorError> {
        Self::new(settings.selectors.clone(), ExtractTimings::from(settings))
    }

    /// Extract every URL in order. Page failures are logged, counted and
    /// skipped; `on_page` sees each URL's result as it completes.
    pub async fn extract_all<P, S, F>(
        &self,
        page: &mut P,
        urls: &[String],
        gate: Option<&HttpClient>,
        sink: &mut S,
        mut on_page: F,
    ) -> ExtractStats
    where
        P: RenderedPage + ?Sized,
        S: RecordSink + ?Sized,
        F: FnMut(&str, Result<&PageOutcome, &PageError>),
    {
        let mut stats = ExtractStats::default();

        for url in urls {
            let result = match gate {
                Some(client) => match client.check_allowed(url).await {
                    Ok(_) => self.extract_page(page, url, sink).await,
                    Err(e) => Err(PageError::Skipped(e)),
                },
                None => self.extract_page(page, url, sink).await,
            };

            match &result {
                Ok(outcome) => stats.record(outcome),
                Err(PageError::Skipped(e)) => {
                    warn!("Skipping {}: {}", url, e);
                    stats.errors += 1;
                }
                Err(e) => {
                    error!("Failed to extract {}: {}", url, e);
                    stats.errors += 1;
                }
            }
            on_page(url, result.as_ref());
        }

        info!(
            "Extracted {} pages: {} base records, {} variant records, {} errors",
            stats.pages, stats.base_records, stats.variant_records, stats.errors
        );
        stats
    }

    /// Render one product page and emit its base and variant records.
    ///
    /// Only rendering failures are returned; variant failures end the walk
    /// early and leave already emitted records in place.
    pub async fn extract_page<P, S>(
        &self,
        page: &mut P,
        url: &str,
        sink: &mut S,
    ) -> Result<PageOutcome, PageError>
    where
        P: RenderedPage + ?Sized,
        S: RecordSink + ?Sized,
    {
        page.open(url).await?;
        page.pause(self.timings.render_wait).await;

        let mut outcome = PageOutcome {
            url: url.to_string(),
            ..Default::default()
        };

        let base = self.base_record(page, url).await?;
        sink.accept(base);
        outcome.base_emitted = true;

        if let Err(e) = self.walk_variants(page, url, sink, &mut outcome).await {
            warn!(
                "Variant enumeration stopped for {} after {} of {}: {}",
                url, outcome.variants_emitted, outcome.variants_expected, e
            );
            outcome.variants_cut_short = true;
        }

        Ok(outcome)
    }

    /// Structured data and breadcrumbs of the page as currently rendered.
    async fn base_record<P>(&self, page: &mut P, url: &str) -> Result<ProductRecord, BrowserError>
    where
        P: RenderedPage + ?Sized,
    {
        let has_product = page
            .wait_for(&self.selectors.structured_data, self.timings.marker_timeout)
            .await?;
        if !has_product {
            warn!("No product structured data on {}", url);
        }

        let has_breadcrumbs = page
            .wait_for(&self.selectors.breadcrumbs, self.timings.marker_timeout)
            .await?;
        if !has_breadcrumbs {
            warn!("No breadcrumb structured data on {}", url);
        }

        let html = page.content().await?;
        Ok(self.parse_base_record(&html, url))
    }

    fn parse_base_record(&self, html: &str, url: &str) -> ProductRecord {
        let document = Html::parse_document(html);

        let product_json = structured::script_text(&document, &self.compiled.structured_data);
        let mut record = match product_json.as_deref().map(parse_product) {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                warn!("Unreadable product structured data on {}: {}", url, e);
                ProductRecord::default()
            }
            None => ProductRecord::default(),
        };

        let breadcrumb_json = structured::script_text(&document, &self.compiled.breadcrumbs);
        match breadcrumb_json.as_deref().map(parse_breadcrumbs) {
            Some(Ok(categories)) => {
                record.main_category = categories.main_category;
                record.sub_categories = categories.sub_categories;
            }
            Some(Err(e)) => warn!("Unreadable breadcrumb data on {}: {}", url, e),
            None => {}
        }

        record
    }

    fn parse_features(&self, html: &str) -> Vec<VariantFeature> {
        let document = Html::parse_document(html);
        feature_groups(&document, &self.compiled)
    }

    async fn walk_variants<P, S>(
        &self,
        page: &mut P,
        url: &str,
        sink: &mut S,
        outcome: &mut PageOutcome,
    ) -> Result<(), BrowserError>
    where
        P: RenderedPage + ?Sized,
        S: RecordSink + ?Sized,
    {
        let has_region = page
            .wait_for(&self.selectors.variant_region, self.timings.variant_timeout)
            .await?;
        if !has_region {
            warn!("No variant region on {}; keeping the base record only", url);
            return Ok(());
        }

        let html = page.content().await?;
        let features = self.parse_features(&html);
        let mut walker = VariantWalker::new(features);
        outcome.variants_expected = walker.total();
        if walker.total() == 0 {
            debug!("Variant region on {} has no selectable options", url);
            return Ok(());
        }

        debug!("Walking {} variant combinations on {}", walker.total(), url);

        while let Some(step) = walker.next_step() {
            match step {
                WalkStep::Click { feature, option } => {
                    page.click_option(&self.selectors, feature, option).await?;
                }
                WalkStep::ReadLabel { feature, option } => {
                    let label = page.option_label(&self.selectors, feature, option).await?;
                    walker.record_label(label);
                }
                WalkStep::Settle => page.pause(self.timings.settle_delay).await,
                WalkStep::Extract { variant_name } => {
                    let record = self
                        .base_record(page, url)
                        .await?
                        .with_variant_name(variant_name);
                    sink.accept(record);
                    outcome.variants_emitted += 1;
                }
            }
        }

        Ok(())
    }
}
