//! `storefeed collect`.

use crate::cli::icons::{dim_arrow, info, success, warn};
use crate::config::Settings;
use crate::scrapers::HttpClient;
use crate::services::collect::{CollectReport, UrlCollector};

pub async fn cmd_collect(settings: &Settings) -> anyhow::Result<CollectReport> {
    println!("{} Collecting product URLs from {}", info(), settings.sitemap_url);

    let client = HttpClient::from_settings(settings)?;
    let collector = UrlCollector::from_settings(settings, client)?;
    let report = collector.collect_to(&settings.links_path).await?;

    if report.sitemap_failures > 0 {
        println!(
            "{} {} of {} sitemaps could not be read",
            warn(),
            report.sitemap_failures,
            report.sitemaps_seen.max(report.sitemap_failures)
        );
    }
    if report.variant_lookup_failures > 0 {
        println!(
            "{} {} product pages kept without variant links",
            warn(),
            report.variant_lookup_failures
        );
    }
    for (host, stats) in &report.throttle {
        if stats.rate_limit_hits > 0 || stats.server_errors > 0 {
            println!(
                "{} {}: {} rate limits, {} server errors, delay now {:?}",
                warn(),
                host,
                stats.rate_limit_hits,
                stats.server_errors,
                stats.current_delay
            );
        }
    }
    println!(
        "{} {} URLs from {} product pages",
        success(),
        report.urls_written,
        report.product_pages
    );
    println!("  {} {}", dim_arrow(), report.output.display());

    Ok(report)
}
