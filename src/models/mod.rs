//! Data models for the product feed.

mod product;
mod url_set;
mod variant;

pub(crate) use product::clean_text;
pub use product::{Price, ProductRecord};
pub use url_set::CollectedUrlSet;
pub use variant::{parse_feature_name, variant_name, Combinations, VariantFeature};
