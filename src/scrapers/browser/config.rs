//! Browser engine configuration.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Inject stealth evasion scripts after each navigation (default: true).
    #[serde(default = "default_stealth")]
    pub stealth: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Navigation and DevTools request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            stealth: default_stealth(),
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_stealth() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let config: BrowserEngineConfig = serde_json::from_str(r#"{"headless": false}"#).unwrap();
        assert!(!config.headless);
        assert!(config.stealth);
        assert_eq!(config.timeout, 30);
        assert!(config.remote_url.is_none());
    }
}
