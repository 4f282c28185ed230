//! Variant features and their combinations.

use std::sync::LazyLock;

use regex::Regex;

/// Caption pattern: one or more word/space characters followed by a colon.
static FEATURE_CAPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w\s]+):").expect("valid feature caption regex"));

/// A selectable variant dimension on a product page (e.g. "Color").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFeature {
    /// Display name parsed from the group caption, `None` when unknown.
    pub name: Option<String>,
    /// Number of clickable options, in DOM order.
    pub option_count: usize,
}

impl VariantFeature {
    /// Build a feature from its raw caption text.
    pub fn from_caption(caption: &str, option_count: usize) -> Self {
        Self {
            name: parse_feature_name(caption),
            option_count,
        }
    }
}

/// Derive a feature's display name from its caption.
///
/// Every `name:` match in the caption is trimmed and the matches are joined
/// with a single space. Returns `None` if nothing matches.
pub fn parse_feature_name(caption: &str) -> Option<String> {
    let parts: Vec<&str> = FEATURE_CAPTION
        .captures_iter(caption)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Join selected labels into a variant name.
///
/// Each part is `Feature: Label`, or just the label when the feature name is
/// unknown. Parts are separated by ` | ` in feature order.
pub fn variant_name<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = (Option<&'a str>, &'a str)>,
{
    parts
        .into_iter()
        .map(|(feature, label)| match feature {
            Some(feature) => format!("{}: {}", feature, label.trim()),
            None => label.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Cartesian product of option indices, last feature varying fastest.
///
/// Yields nothing when there are no features or any feature has no options.
#[derive(Debug, Clone)]
pub struct Combinations {
    sizes: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Combinations {
    pub fn new(sizes: Vec<usize>) -> Self {
        let next = if sizes.is_empty() || sizes.contains(&0) {
            None
        } else {
            Some(vec![0; sizes.len()])
        };
        Self { sizes, next }
    }

    /// Build from a page's feature groups.
    pub fn for_features(features: &[VariantFeature]) -> Self {
        Self::new(features.iter().map(|f| f.option_count).collect())
    }

    /// Total number of combinations.
    pub fn total(&self) -> usize {
        if self.sizes.is_empty() {
            0
        } else {
            self.sizes.iter().product()
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        // Odometer increment from the last position
        let mut advanced = current.clone();
        let mut pos = advanced.len();
        while pos > 0 {
            pos -= 1;
            advanced[pos] += 1;
            if advanced[pos] < self.sizes[pos] {
                self.next = Some(advanced);
                break;
            }
            advanced[pos] = 0;
        }

        Some(current)
    }
}
