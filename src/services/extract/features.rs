//! Variant feature groups read from a rendered page.

use scraper::{Html, Selector};

use crate::config::SiteSelectors;
use crate::models::VariantFeature;
use crate::scrapers::{parse_selector, SelectorError};

/// Storefront selectors compiled for parsing page snapshots.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub structured_data: Selector,
    pub breadcrumbs: Selector,
    pub variant_region: Selector,
    pub feature_group: Selector,
    pub feature_option: Selector,
    pub feature_caption: Selector,
}

impl PageSelectors {
    pub fn compile(selectors: &SiteSelectors) -> Result<Self, SelectorError> {
        Ok(Self {
            structured_data: parse_selector(&selectors.structured_data)?,
            breadcrumbs: parse_selector(&selectors.breadcrumbs)?,
            variant_region: parse_selector(&selectors.variant_region)?,
            feature_group: parse_selector(&selectors.feature_group)?,
            feature_option: parse_selector(&selectors.feature_option)?,
            feature_caption: parse_selector(&selectors.feature_caption)?,
        })
    }
}

/// Feature groups inside the first variant region, in document order.
///
/// A group without a caption element gets an unknown name.
pub fn feature_groups(document: &Html, selectors: &PageSelectors) -> Vec<VariantFeature> {
    let Some(region) = document.select(&selectors.variant_region).next() else {
        return Vec::new();
    };

    region
        .select(&selectors.feature_group)
        .map(|group| {
            let caption: String = group
                .select(&selectors.feature_caption)
                .next()
                .map(|el| el.text().collect())
                .unwrap_or_default();
            let option_count = group.select(&selectors.feature_option).count();
            VariantFeature::from_caption(&caption, option_count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> PageSelectors {
        PageSelectors::compile(&SiteSelectors::default()).unwrap()
    }

    const PAGE: &str = r#"<html><body>
      <div class="lg:hidden"><div class="mb-3"><div class="mb-2 caption">Ignored:</div></div></div>
      <div class="hidden lg:block">
        <div class="mb-3">
          <div class="mb-2 caption">Công suất: 9W</div>
          <div class="flex">
            <div class="mr-2 option"><div class="relative">9W</div></div>
            <div class="mr-2 option"><div class="relative">12W</div></div>
          </div>
        </div>
        <div class="mb-3">
          <div class="mb-2 caption">Ánh sáng: Trắng</div>
          <div class="mr-2"><div class="relative">Trắng</div></div>
          <div class="mr-2"><div class="relative">Vàng</div></div>
          <div class="mr-2"><div class="relative">Trung tính</div></div>
        </div>
        <div class="mb-3">
          <div class="mb-2 caption">Chọn mẫu</div>
          <div class="mr-2"><div class="relative">A</div></div>
        </div>
      </div>
    </body></html>"#;

    #[test]
    fn groups_in_document_order() {
        let document = Html::parse_document(PAGE);
        let features = feature_groups(&document, &selectors());

        assert_eq!(
            features,
            vec![
                VariantFeature {
                    name: Some("Công suất".to_string()),
                    option_count: 2
                },
                VariantFeature {
                    name: Some("Ánh sáng".to_string()),
                    option_count: 3
                },
                VariantFeature {
                    name: None,
                    option_count: 1
                },
            ]
        );
    }

    #[test]
    fn no_region_means_no_features() {
        let document = Html::parse_document("<html><body><div class='mb-3'></div></body></html>");
        assert!(feature_groups(&document, &selectors()).is_empty());
    }
}
