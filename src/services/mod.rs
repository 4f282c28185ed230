//! Pipeline stages: URL collection, product extraction and deduplication.

pub mod collect;
pub mod dedup;
pub mod extract;

pub use collect::{CollectReport, UrlCollector};
pub use dedup::{CrawlSummary, DedupStage};
pub use extract::{ExtractStats, PageOutcome, ProductExtractor, RecordSink};
