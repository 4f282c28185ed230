//! `storefeed extract`.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::error;

use crate::cli::icons::{dim_arrow, error as error_icon, info, skipped, success, warn};
use crate::config::Settings;
use crate::scrapers::{BrowserSession, HttpClient};
use crate::services::dedup::{CrawlSummary, DedupStage};
use crate::services::extract::{ExtractStats, PageError, ProductExtractor};
use crate::storage;

/// Stats file contents.
#[derive(Serialize)]
struct StatsReport<'a> {
    #[serde(flatten)]
    summary: &'a CrawlSummary,
    extract: &'a ExtractStats,
}

fn progress_bar(total: u64) -> ProgressBar {
    let progress = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    progress.set_style(style);
    progress
}

pub async fn cmd_extract(settings: &Settings) -> anyhow::Result<CrawlSummary> {
    let urls = match storage::read_url_list(&settings.links_path).await {
        Ok(urls) => urls,
        Err(e) => {
            error!("Cannot start extraction: {}", e);
            eprintln!("{} {}", error_icon(), e);
            return Err(e.into());
        }
    };

    if urls.is_empty() {
        println!("{} No URLs in {}", warn(), settings.links_path.display());
        return report_run(settings, DedupStage::new(), ExtractStats::default()).await;
    }

    println!("{} Extracting {} product pages", info(), urls.len());

    let gate = HttpClient::from_settings(settings)?;
    let extractor = ProductExtractor::from_settings(settings)?;
    let mut session = BrowserSession::launch(settings.browser.clone()).await?;
    let mut stage = DedupStage::new();

    let progress = progress_bar(urls.len() as u64);
    let stats = extractor
        .extract_all(&mut session, &urls, Some(&gate), &mut stage, |url, result| {
            progress.inc(1);
            match result {
                Ok(outcome) => progress.set_message(format!(
                    "{} (+{} variants)",
                    url, outcome.variants_emitted
                )),
                Err(PageError::Skipped(e)) => {
                    progress.println(format!("{} {}: {}", skipped(), url, e))
                }
                Err(e) => progress.println(format!("{} {}: {}", error_icon(), url, e)),
            }
        })
        .await;
    progress.finish_and_clear();
    session.close().await;

    report_run(settings, stage, stats).await
}

/// Close the dedup stage, write the feed and stats, print the summary.
async fn report_run(
    settings: &Settings,
    stage: DedupStage,
    stats: ExtractStats,
) -> anyhow::Result<CrawlSummary> {
    let (records, summary) = stage.finish(stats.errors);

    if storage::write_feed(&settings.feed_path, &records).await? {
        println!(
            "{} {} products written to {}",
            success(),
            records.len(),
            settings.feed_path.display()
        );
    } else {
        println!("{} No products extracted; feed not written", warn());
    }

    println!(
        "  {} processed {}, dropped {}, errors {}",
        dim_arrow(),
        summary.processed,
        summary.dropped,
        summary.errors
    );
    if stats.variant_walks_cut_short > 0 {
        println!(
            "  {} {} pages had incomplete variant walks",
            dim_arrow(),
            stats.variant_walks_cut_short
        );
    }

    if let Some(ref path) = settings.stats_path {
        let report = StatsReport {
            summary: &summary,
            extract: &stats,
        };
        storage::write_json(path, &report).await?;
        println!("  {} stats written to {}", dim_arrow(), path.display());
    }

    Ok(summary)
}
