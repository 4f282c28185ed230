//! Sitemap parsing and product page link discovery.
//!
//! `<loc>` values are matched by local name so namespace prefixes
//! (`<ns:loc>`) and default namespaces both work.

use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Marker identifying product detail pages in the storefront's URL scheme.
pub const PRODUCT_URL_MARKER: &str = "-p-";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Malformed sitemap XML: {0}")]
    Malformed(String),
}

/// The element a `<loc>` must sit in to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocParent {
    /// `<sitemapindex><sitemap><loc>` entries.
    Sitemap,
    /// `<urlset><url><loc>` entries.
    Url,
}

impl LocParent {
    fn local_name(self) -> &'static [u8] {
        match self {
            Self::Sitemap => b"sitemap",
            Self::Url => b"url",
        }
    }
}

/// Extract trimmed `<loc>` values whose parent element matches `parent`.
pub fn extract_locs(xml: &str, parent: LocParent) -> Result<Vec<String>, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut locs = Vec::new();

    let in_wanted_loc = |stack: &[Vec<u8>]| {
        stack.len() >= 2
            && stack[stack.len() - 1] == b"loc"
            && stack[stack.len() - 2] == parent.local_name()
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) if in_wanted_loc(&stack) => {
                let text = t
                    .unescape()
                    .map_err(|e| SitemapError::Malformed(e.to_string()))?;
                push_loc(&mut locs, &text);
            }
            Ok(Event::CData(c)) if in_wanted_loc(&stack) => {
                push_loc(&mut locs, &String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SitemapError::Malformed(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(locs)
}

fn push_loc(locs: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        locs.push(text.to_string());
    }
}

/// Child sitemap URLs listed by a sitemap index.
pub fn sitemap_locs(xml: &str) -> Result<Vec<String>, SitemapError> {
    extract_locs(xml, LocParent::Sitemap)
}

/// Page URLs listed by a URL set.
pub fn page_locs(xml: &str) -> Result<Vec<String>, SitemapError> {
    extract_locs(xml, LocParent::Url)
}

pub fn is_product_url(url: &str) -> bool {
    url.contains(PRODUCT_URL_MARKER)
}

/// Absolute `href`s of the elements matching `selector`, in document order.
pub fn variant_links(html: &str, page_url: &Url, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| page_url.join(href).ok())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::selector::parse_selector;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc> https://rangdongstore.vn/sitemap-products-1.xml </loc></sitemap>
  <sitemap><loc>https://rangdongstore.vn/sitemap-pages.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
</sitemapindex>"#;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns:urlset xmlns:ns="http://www.sitemaps.org/schemas/sitemap/0.9"
           xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <ns:url>
    <ns:loc>https://rangdongstore.vn/den-led-bulb-p-101</ns:loc>
    <image:image><image:loc>https://cdn.rangdongstore.vn/a.jpg</image:loc></image:image>
  </ns:url>
  <ns:url><ns:loc>https://rangdongstore.vn/gioi-thieu</ns:loc></ns:url>
  <ns:url><ns:loc><![CDATA[https://rangdongstore.vn/phich-p-7?a=1&b=2]]></ns:loc></ns:url>
</ns:urlset>"#;

    #[test]
    fn index_locs_are_trimmed() {
        assert_eq!(
            sitemap_locs(INDEX).unwrap(),
            vec![
                "https://rangdongstore.vn/sitemap-products-1.xml",
                "https://rangdongstore.vn/sitemap-pages.xml",
            ]
        );
    }

    #[test]
    fn urlset_ignores_namespace_prefix_and_image_locs() {
        assert_eq!(
            page_locs(URLSET).unwrap(),
            vec![
                "https://rangdongstore.vn/den-led-bulb-p-101",
                "https://rangdongstore.vn/gioi-thieu",
                "https://rangdongstore.vn/phich-p-7?a=1&b=2",
            ]
        );
    }

    #[test]
    fn parent_must_match() {
        assert!(page_locs(INDEX).unwrap().is_empty());
        assert!(sitemap_locs(URLSET).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = page_locs("<urlset><url><loc>https://x/a-p-1</url></urlset>").unwrap_err();
        assert!(matches!(err, SitemapError::Malformed(_)));
    }

    #[test]
    fn product_url_marker() {
        assert!(is_product_url("https://rangdongstore.vn/den-led-p-101"));
        assert!(!is_product_url("https://rangdongstore.vn/tin-tuc"));
    }

    #[test]
    fn variant_links_resolve_against_page() {
        let html = r#"<html><body>
            <div class="mb-4">
              <div class="flex radio-content"><a href="/den-led-p-101?v=2">9W</a></div>
              <div class="radio-content active"><a href="https://rangdongstore.vn/den-led-p-102">12W</a></div>
              <div class="radio-content"><a>no href</a></div>
            </div>
            <div class="radio-content"><a href="/outside-p-9">outside</a></div>
        </body></html>"#;
        let page = Url::parse("https://rangdongstore.vn/den-led-p-101").unwrap();
        let selector = parse_selector(r#".mb-4 [class*="radio-content"] a"#).unwrap();

        assert_eq!(
            variant_links(html, &page, &selector),
            vec![
                "https://rangdongstore.vn/den-led-p-101?v=2",
                "https://rangdongstore.vn/den-led-p-102",
            ]
        );
    }
}
