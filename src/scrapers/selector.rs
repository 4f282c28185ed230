//! CSS selector compilation for configured selectors.

use scraper::Selector;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid selector {selector:?}: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

pub fn parse_selector(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
