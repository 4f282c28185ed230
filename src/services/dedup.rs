//! Sku-keyed deduplication and the crawl summary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::extract::RecordSink;
use crate::models::ProductRecord;

/// Key shared by every record without a sku.
pub const MISSING_SKU_KEY: &str = "no sku";

/// Counters reported at the end of an extract run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub processed: u64,
    pub dropped: u64,
    pub errors: u64,
}

impl CrawlSummary {
    pub fn log(&self) {
        info!(
            "Crawl finished: {} processed, {} duplicates dropped, {} errors",
            self.processed, self.dropped, self.errors
        );
    }
}

/// Keeps the first record seen for each sku, in arrival order.
#[derive(Debug, Default)]
pub struct DedupStage {
    seen: HashSet<String>,
    accepted: Vec<ProductRecord>,
    dropped: u64,
}

impl DedupStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the record was kept.
    pub fn offer(&mut self, record: ProductRecord) -> bool {
        let key = record
            .sku
            .clone()
            .unwrap_or_else(|| MISSING_SKU_KEY.to_string());

        if self.seen.insert(key) {
            self.accepted.push(record);
            true
        } else {
            self.dropped += 1;
            debug!(
                "Dropping duplicate sku {:?} from {}",
                record.sku.as_deref().unwrap_or(MISSING_SKU_KEY),
                record.url.as_deref().unwrap_or("unknown url")
            );
            false
        }
    }

    pub fn processed(&self) -> u64 {
        self.accepted.len() as u64
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Close the stage, returning the kept records and the summary.
    pub fn finish(self, errors: u64) -> (Vec<ProductRecord>, CrawlSummary) {
        let summary = CrawlSummary {
            processed: self.accepted.len() as u64,
            dropped: self.dropped,
            errors,
        };
        summary.log();
        (self.accepted, summary)
    }
}

impl RecordSink for DedupStage {
    fn accept(&mut self, record: ProductRecord) {
        self.offer(record);
    }
}
