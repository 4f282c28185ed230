//! storefeed - product feed crawler for a single storefront.
//!
//! Collects product URLs from the storefront's sitemap index, renders each
//! product page in a browser to extract structured data and every variant
//! combination, and writes a sku-deduplicated JSON feed.

pub mod cli;
pub mod config;
pub mod models;
pub mod scrapers;
pub mod services;
pub mod storage;
