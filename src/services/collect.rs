//! Product URL collection from the sitemap index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use scraper::Selector;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::models::CollectedUrlSet;
use crate::scrapers::sitemap::{is_product_url, page_locs, sitemap_locs, variant_links};
use crate::scrapers::rate_limiter::HostStats;
use crate::scrapers::{parse_selector, FetchError, HttpClient, SelectorError};
use crate::storage::{self, StorageError};

/// Counters for one collect run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub sitemaps_seen: usize,
    pub sitemap_failures: usize,
    pub product_pages: usize,
    /// Product pages whose variant lookup failed (base URL kept).
    pub variant_lookup_failures: usize,
    pub urls_written: usize,
    pub output: PathBuf,
    /// Throttle state per host at the end of the run.
    pub throttle: BTreeMap<String, HostStats>,
}

pub struct UrlCollector {
    client: HttpClient,
    sitemap_url: String,
    concurrency: usize,
    variant_links: Selector,
}

fn log_fetch_failure(what: &str, url: &str, error: &FetchError) {
    if error.is_gate() {
        debug!("Skipping {} {}: {}", what, url, error);
    } else {
        warn!("Failed to fetch {} {}: {}", what, url, error);
    }
}

impl UrlCollector {
    pub fn new(
        client: HttpClient,
        sitemap_url: impl Into<String>,
        concurrency: usize,
        variant_links_selector: &str,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            client,
            sitemap_url: sitemap_url.into(),
            concurrency: concurrency.max(1),
            variant_links: parse_selector(variant_links_selector)?,
        })
    }

    pub fn from_settings(settings: &Settings, client: HttpClient) -> Result<Self, SelectorError> {
        Self::new(
            client,
            settings.sitemap_url.clone(),
            settings.concurrency,
            &settings.selectors.variant_links,
        )
    }

    /// Collect and persist the URL list.
    ///
    /// The file is written even when nothing was collected.
    pub async fn collect_to(&self, path: &Path) -> Result<CollectReport, StorageError> {
        let (urls, mut report) = self.collect().await;
        storage::write_url_list(path, &urls).await?;
        report.urls_written = urls.len();
        report.output = path.to_path_buf();
        Ok(report)
    }

    /// Walk the sitemap index and product pages.
    pub async fn collect(&self) -> (CollectedUrlSet, CollectReport) {
        let mut report = CollectReport::default();

        let sitemaps = self.child_sitemaps(&mut report).await;
        report.sitemaps_seen = sitemaps.len();
        info!("Found {} sitemaps in {}", sitemaps.len(), self.sitemap_url);

        let products = self.product_urls(sitemaps, &mut report).await;
        report.product_pages = products.len();
        info!("Found {} product pages", products.len());

        let mut urls = CollectedUrlSet::new();
        let mut pages = stream::iter(products)
            .map(|url| self.expand_variants(url))
            .buffer_unordered(self.concurrency);

        while let Some((expanded, lookup_ok)) = pages.next().await {
            if !lookup_ok {
                report.variant_lookup_failures += 1;
            }
            urls.extend(expanded);
        }

        report.throttle = self.client.rate_limiter().stats().await.into_iter().collect();
        (urls, report)
    }

    async fn child_sitemaps(&self, report: &mut CollectReport) -> Vec<String> {
        let body = match self.client.get_text(&self.sitemap_url).await {
            Ok(body) => body,
            Err(e) => {
                log_fetch_failure("sitemap index", &self.sitemap_url, &e);
                report.sitemap_failures += 1;
                return Vec::new();
            }
        };

        match sitemap_locs(&body) {
            Ok(locs) => locs,
            Err(e) => {
                warn!("Skipping sitemap index {}: {}", self.sitemap_url, e);
                report.sitemap_failures += 1;
                Vec::new()
            }
        }
    }

    /// Product URLs across all child sitemaps, deduplicated.
    async fn product_urls(&self, sitemaps: Vec<String>, report: &mut CollectReport) -> BTreeSet<String> {
        let mut fetched = stream::iter(sitemaps)
            .map(|url| async move {
                let result = self.client.get_text(&url).await;
                (url, result)
            })
            .buffer_unordered(self.concurrency);

        let mut products = BTreeSet::new();
        while let Some((url, result)) = fetched.next().await {
            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    log_fetch_failure("sitemap", &url, &e);
                    report.sitemap_failures += 1;
                    continue;
                }
            };

            match page_locs(&body) {
                Ok(locs) => {
                    let before = products.len();
                    products.extend(locs.into_iter().filter(|loc| is_product_url(loc)));
                    debug!("{}: {} new product URLs", url, products.len() - before);
                }
                Err(e) => {
                    warn!("Skipping sitemap {}: {}", url, e);
                    report.sitemap_failures += 1;
                }
            }
        }
        products
    }

    /// The product URL plus its variant links. Falls back to the URL alone
    /// when the page cannot be read; the flag reports whether lookup worked.
    /// Unparseable URLs and URLs rejected by the crawl gates yield nothing.
    async fn expand_variants(&self, url: String) -> (Vec<String>, bool) {
        let base = match Url::parse(&url) {
            Ok(base) => base,
            Err(e) => {
                warn!("Dropping product URL {}: {}", url, e);
                return (Vec::new(), false);
            }
        };

        match self.client.get_text(&url).await {
            Ok(html) => {
                let mut expanded = variant_links(&html, &base, &self.variant_links);
                debug!("{}: {} variant links", url, expanded.len());
                expanded.push(url);
                (expanded, true)
            }
            Err(e) if e.is_gate() => {
                debug!("Dropping product URL {}: {}", url, e);
                (Vec::new(), true)
            }
            Err(e) => {
                log_fetch_failure("product page", &url, &e);
                (vec![url], false)
            }
        }
    }
}
