//! Configuration management for storefeed using the prefer crate.
//!
//! Resolution order, lowest to highest precedence:
//! 1. built-in [`Settings`] defaults (tuned for the target storefront)
//! 2. a config file, either `--config <path>` or discovered by prefer
//! 3. `STOREFEED_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scrapers::rate_limiter::RateLimitConfig;
use crate::scrapers::BrowserEngineConfig;

/// Directory holding both pipeline artifacts by default.
const DATA_SUBDIR: &str = "product_data";

/// HTTP status codes treated as transient and retried.
pub const DEFAULT_RETRY_HTTP_CODES: &[u16] = &[500, 502, 503, 504, 522, 524, 408, 429];

/// CSS selectors and marker ids describing the target storefront's markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// Product JSON-LD script element.
    pub structured_data: String,
    /// Breadcrumb JSON-LD script element.
    pub breadcrumbs: String,
    /// Container holding the clickable variant options.
    pub variant_region: String,
    /// One feature group (e.g. "Color") inside the variant region.
    pub feature_group: String,
    /// One clickable option inside a feature group.
    pub feature_option: String,
    /// Caption text naming the feature group.
    pub feature_caption: String,
    /// Label displayed inside an option.
    pub option_label: String,
    /// Links to URL-based variants on a product page (collector).
    pub variant_links: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            structured_data: "#product-structured-data-script".to_string(),
            breadcrumbs: "#breadcrumblist-structured-data-script".to_string(),
            variant_region: r#"div[class="hidden lg:block"]"#.to_string(),
            feature_group: ".mb-3".to_string(),
            feature_option: r#"div[class*="mr-2"]"#.to_string(),
            feature_caption: r#"div[class="mb-2 caption"]"#.to_string(),
            option_label: r#"div[class*="relative"]"#.to_string(),
            variant_links: r#".mb-4 [class*="radio-content"] a"#.to_string(),
        }
    }
}

/// Application settings, fully resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Sitemap index the collector starts from.
    pub sitemap_url: String,
    /// Requests outside this host (and its subdomains) are skipped.
    pub allowed_domain: String,
    /// User agent for HTTP requests ("impersonate" picks a browser UA).
    pub user_agent: String,
    /// Maximum in-flight HTTP requests during collection.
    pub concurrency: usize,
    /// Base per-host delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Ceiling for the adaptive per-host delay in milliseconds.
    pub max_delay_ms: u64,
    /// HTTP response timeout in seconds.
    pub request_timeout: u64,
    /// Retries after the first attempt for transient failures.
    pub retry_times: u32,
    /// Status codes considered transient.
    pub retry_http_codes: Vec<u16>,
    /// Honour robots.txt.
    pub obey_robots: bool,
    /// Collector output and extractor input.
    pub links_path: PathBuf,
    /// Final product feed.
    pub feed_path: PathBuf,
    /// Optional JSON summary of the extract run.
    pub stats_path: Option<PathBuf>,
    /// Extra wait after navigation for client-side rendering, in milliseconds.
    pub render_wait_ms: u64,
    /// Bounded wait for structured data markers, in seconds.
    pub marker_timeout: u64,
    /// Bounded wait for the variant region, in seconds.
    pub variant_timeout: u64,
    /// Pause after the clicks of one variant combination, in milliseconds.
    pub settle_delay_ms: u64,
    /// Browser engine settings.
    pub browser: BrowserEngineConfig,
    /// Storefront markup.
    pub selectors: SiteSelectors,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = PathBuf::from(DATA_SUBDIR);

        Self {
            sitemap_url: "https://rangdongstore.vn/sitemap.xml".to_string(),
            allowed_domain: "rangdongstore.vn".to_string(),
            user_agent: crate::scrapers::http_client::USER_AGENT.to_string(),
            concurrency: 8,
            request_delay_ms: 1000,
            max_delay_ms: 5000,
            request_timeout: 15,
            retry_times: 3,
            retry_http_codes: DEFAULT_RETRY_HTTP_CODES.to_vec(),
            obey_robots: true,
            links_path: data_dir.join("product_links.json"),
            feed_path: data_dir.join("products.json"),
            stats_path: None,
            render_wait_ms: 5000,
            marker_timeout: 10,
            variant_timeout: 15,
            settle_delay_ms: 2000,
            browser: BrowserEngineConfig::default(),
            selectors: SiteSelectors::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_millis(self.render_wait_ms)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_secs(self.marker_timeout)
    }

    pub fn variant_timeout(&self) -> Duration {
        Duration::from_secs(self.variant_timeout)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Adaptive throttling parameters derived from the delay settings.
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        let base_delay = self.request_delay();
        RateLimitConfig {
            base_delay,
            max_delay: Duration::from_millis(self.max_delay_ms).max(base_delay),
            ..Default::default()
        }
    }

    /// Apply `STOREFEED_*` overrides using the given variable lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(name).filter(|s| !s.trim().is_empty());

        if let Some(v) = get("STOREFEED_SITEMAP_URL") {
            self.sitemap_url = v;
        }
        if let Some(v) = get("STOREFEED_ALLOWED_DOMAIN") {
            self.allowed_domain = v;
        }
        if let Some(v) = get("STOREFEED_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = get("STOREFEED_CONCURRENCY") {
            set_parsed(&mut self.concurrency, "STOREFEED_CONCURRENCY", &v);
        }
        if let Some(v) = get("STOREFEED_REQUEST_DELAY_MS") {
            set_parsed(&mut self.request_delay_ms, "STOREFEED_REQUEST_DELAY_MS", &v);
        }
        if let Some(v) = get("STOREFEED_RETRY_TIMES") {
            set_parsed(&mut self.retry_times, "STOREFEED_RETRY_TIMES", &v);
        }
        if let Some(v) = get("STOREFEED_RETRY_HTTP_CODES") {
            match parse_status_list(&v) {
                Some(codes) => self.retry_http_codes = codes,
                None => tracing::warn!("Ignoring invalid STOREFEED_RETRY_HTTP_CODES: {}", v),
            }
        }
        if let Some(v) = get("STOREFEED_RENDER_TIMEOUT") {
            set_parsed(&mut self.marker_timeout, "STOREFEED_RENDER_TIMEOUT", &v);
        }
        if let Some(v) = get("STOREFEED_LINKS_PATH") {
            self.links_path = PathBuf::from(v);
        }
        if let Some(v) = get("STOREFEED_FEED_PATH") {
            self.feed_path = PathBuf::from(v);
        }
        if let Some(v) = get("STOREFEED_STATS_PATH") {
            self.stats_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("STOREFEED_HEADLESS") {
            match parse_bool(&v) {
                Some(headless) => self.browser.headless = headless,
                None => tracing::warn!("Ignoring invalid STOREFEED_HEADLESS: {}", v),
            }
        }
        if let Some(v) = get("STOREFEED_OBEY_ROBOTS") {
            match parse_bool(&v) {
                Some(obey) => self.obey_robots = obey,
                None => tracing::warn!("Ignoring invalid STOREFEED_OBEY_ROBOTS: {}", v),
            }
        }
        if let Some(v) = get("STOREFEED_BROWSER_URL") {
            self.browser.remote_url = Some(v);
        }
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, name: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!("Ignoring invalid {}: {}", name, value),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_status_list(value: &str) -> Option<Vec<u16>> {
    value
        .split(',')
        .map(|s| s.trim().parse::<u16>().ok())
        .collect()
}

/// Selector overrides from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct SelectorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_links: Option<String>,
}

impl SelectorsConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, selectors: &mut SiteSelectors) {
        let pairs = [
            (&self.structured_data, &mut selectors.structured_data),
            (&self.breadcrumbs, &mut selectors.breadcrumbs),
            (&self.variant_region, &mut selectors.variant_region),
            (&self.feature_group, &mut selectors.feature_group),
            (&self.feature_option, &mut selectors.feature_option),
            (&self.feature_caption, &mut selectors.feature_caption),
            (&self.option_label, &mut selectors.option_label),
            (&self.variant_links, &mut selectors.variant_links),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitemap_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_times: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(skip)]
    pub retry_http_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obey_robots: Option<bool>,
    /// Relative paths resolve against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_wait_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    /// Browser engine configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(skip)]
    pub browser: Option<BrowserEngineConfig>,
    #[serde(default, skip_serializing_if = "SelectorsConfig::is_default")]
    #[prefer(default)]
    pub selectors: SelectorsConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no `storefeed` config file is found.
    pub async fn load() -> Self {
        match prefer::load("storefeed").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref url) = self.sitemap_url {
            settings.sitemap_url = url.clone();
        }
        if let Some(ref domain) = self.allowed_domain {
            settings.allowed_domain = domain.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency.max(1);
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(delay) = self.max_delay_ms {
            settings.max_delay_ms = delay;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(retries) = self.retry_times {
            settings.retry_times = retries;
        }
        if let Some(ref codes) = self.retry_http_codes {
            settings.retry_http_codes = codes.clone();
        }
        if let Some(obey) = self.obey_robots {
            settings.obey_robots = obey;
        }
        if let Some(ref path) = self.links_path {
            settings.links_path = self.resolve_path(path, base_dir);
        }
        if let Some(ref path) = self.feed_path {
            settings.feed_path = self.resolve_path(path, base_dir);
        }
        if let Some(ref path) = self.stats_path {
            settings.stats_path = Some(self.resolve_path(path, base_dir));
        }
        if let Some(wait) = self.render_wait_ms {
            settings.render_wait_ms = wait;
        }
        if let Some(timeout) = self.marker_timeout {
            settings.marker_timeout = timeout;
        }
        if let Some(timeout) = self.variant_timeout {
            settings.variant_timeout = timeout;
        }
        if let Some(delay) = self.settle_delay_ms {
            settings.settle_delay_ms = delay;
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
        }
        self.selectors.apply_to(&mut settings.selectors);
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> anyhow::Result<(Settings, Config)> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path)
            .await
            .map_err(anyhow::Error::msg)?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or(cwd);
    config.apply_to_settings(&mut settings, &base_dir);

    // Environment variables take highest precedence
    settings.apply_env_overrides(|name| std::env::var(name).ok());

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    Ok((settings, config))
}
