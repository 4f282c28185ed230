//! chromiumoxide-backed [`RenderedPage`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::stealth::{BROWSER_USER_AGENT, STEALTH_SCRIPTS};
use super::{BrowserEngineConfig, BrowserError, RenderedPage};
use crate::config::SiteSelectors;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState));
            setTimeout(() => resolve(document.readyState), 10000);
        }
    })
"#;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        BrowserError::Protocol(e.to_string())
    }
}

fn find_chrome() -> Result<PathBuf, BrowserError> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    info!("Found Chrome in PATH: {}", path);
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(BrowserError::Launch(
        "Chrome/Chromium not found; install it or set browser.remote_url".to_string(),
    ))
}

fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    })
}

/// One browser holding the single page the extractor works in.
pub struct BrowserSession {
    config: BrowserEngineConfig,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    remote: bool,
}

impl BrowserSession {
    /// Launch a local browser, or attach to `remote_url` when configured.
    pub async fn launch(config: BrowserEngineConfig) -> Result<Self, BrowserError> {
        let remote = config.remote_url.is_some();
        let (browser, handler) = match config.remote_url.clone() {
            Some(url) => Self::connect_remote(&url, &config).await?,
            None => Self::launch_local(&config).await?,
        };

        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(BROWSER_USER_AGENT.to_string()))
            .await?;

        Ok(Self {
            config,
            browser,
            page,
            handler,
            remote,
        })
    }

    async fn launch_local(
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, JoinHandle<()>), BrowserError> {
        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(find_chrome()?)
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--window-size=1920,1080");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok((browser, spawn_handler(handler)))
    }

    async fn connect_remote(
        url: &str,
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, JoinHandle<()>), BrowserError> {
        info!("Connecting to remote browser at {}", url);

        let ws_url = if url.contains("/devtools/browser/") {
            url.to_string()
        } else {
            let http_url = url
                .replace("ws://", "http://")
                .replace("wss://", "https://");
            let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

            let version: serde_json::Value = reqwest::get(&version_url)
                .await
                .map_err(|e| BrowserError::Launch(format!("{}: {}", version_url, e)))?
                .json()
                .await
                .map_err(|e| BrowserError::Launch(format!("{}: {}", version_url, e)))?;

            version
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    BrowserError::Launch("No webSocketDebuggerUrl in /json/version".to_string())
                })?
                .to_string()
        };

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok((browser, spawn_handler(handler)))
    }

    /// Close the page, and the browser too when this session launched it.
    pub async fn close(mut self) {
        let _ = self.page.clone().close().await;
        if !self.remote {
            if let Err(e) = self.browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
    }

    async fn wait_until_ready(&self) {
        let timeout = Duration::from_secs(self.config.timeout);
        match tokio::time::timeout(timeout, self.page.evaluate(WAIT_FOR_READY_SCRIPT)).await {
            Ok(Ok(result)) => {
                let state: String = result.into_value().unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }

    async fn apply_stealth(&self) {
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(*script).await {
                debug!("Stealth script skipped: {}", e);
            }
        }
    }

    /// Re-query the option element from the region down.
    async fn locate_option(
        &self,
        selectors: &SiteSelectors,
        feature: usize,
        option: usize,
    ) -> Result<Element, BrowserError> {
        let region = self
            .page
            .find_element(selectors.variant_region.as_str())
            .await
            .map_err(|_| BrowserError::ElementNotFound(selectors.variant_region.clone()))?;

        let group = region
            .find_elements(selectors.feature_group.as_str())
            .await?
            .into_iter()
            .nth(feature)
            .ok_or_else(|| {
                BrowserError::ElementNotFound(format!("{} #{}", selectors.feature_group, feature))
            })?;

        group
            .find_elements(selectors.feature_option.as_str())
            .await?
            .into_iter()
            .nth(option)
            .ok_or_else(|| {
                BrowserError::ElementNotFound(format!(
                    "{} #{} in feature #{}",
                    selectors.feature_option, option, feature
                ))
            })
    }
}

#[async_trait]
impl RenderedPage for BrowserSession {
    async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| BrowserError::Navigation {
                url: url.to_string(),
                reason,
            })?;

        let timeout = Duration::from_secs(self.config.timeout);
        let response = tokio::time::timeout(timeout, self.page.execute(params))
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation to {}", url),
                after: timeout,
            })?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(ref error_text) = response.result.error_text {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: error_text.clone(),
            });
        }

        self.wait_until_ready().await;
        if self.config.stealth {
            self.apply_stealth().await;
        }
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BrowserError> {
        let page = &self.page;
        let found = tokio::time::timeout(timeout, async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok();
        Ok(found)
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn click_option(
        &mut self,
        selectors: &SiteSelectors,
        feature: usize,
        option: usize,
    ) -> Result<(), BrowserError> {
        let element = self.locate_option(selectors, feature, option).await?;
        // Scrolls into view, moves the pointer to the element's center, clicks.
        element.click().await?;
        Ok(())
    }

    async fn option_label(
        &mut self,
        selectors: &SiteSelectors,
        feature: usize,
        option: usize,
    ) -> Result<String, BrowserError> {
        let element = self.locate_option(selectors, feature, option).await?;
        let label = element
            .find_element(selectors.option_label.as_str())
            .await
            .map_err(|_| BrowserError::ElementNotFound(selectors.option_label.clone()))?;
        Ok(label.inner_text().await?.unwrap_or_default().trim().to_string())
    }
}
