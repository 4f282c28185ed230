//! Product records emitted by the extractor.
//!
//! Every field except `sub_categories` is optional. Absent fields are left out
//! of the serialized feed entirely so a page with gaps still yields a
//! well-formed record.

use serde::{Deserialize, Serialize};

/// Price as published in the page's structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Number(serde_json::Number),
    Text(String),
}

impl Price {
    /// Build a price from a structured data value.
    ///
    /// Numbers and strings are kept as-is; anything else is not a price.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Price::Number(n.clone())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Price::Text(s.clone())),
            _ => None,
        }
    }
}

/// One entry of the product feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Deduplication key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(
        rename = "productID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_categories: Vec<String>,
    /// "Feature: Value | Feature: Value" for variant records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
}

impl ProductRecord {
    /// Copy of this record describing one variant combination.
    pub fn with_variant_name(mut self, variant_name: impl Into<String>) -> Self {
        self.variant_name = clean_text(&variant_name.into());
        self
    }

    /// True when nothing at all could be extracted.
    pub fn is_empty(&self) -> bool {
        *self == ProductRecord::default()
    }
}

/// Trim a text value, treating blank strings as absent.
pub(crate) fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_omitted() {
        let record = ProductRecord {
            name: Some("Đèn LED".to_string()),
            sku: Some("SKU1".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Đèn LED","sku":"SKU1"}"#);
    }

    #[test]
    fn product_id_keeps_feed_field_name() {
        let record = ProductRecord {
            product_id: Some("221222002669".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["productID"], "221222002669");
    }

    #[test]
    fn price_keeps_published_form() {
        let number = Price::from_json(&serde_json::json!(125000)).unwrap();
        let text = Price::from_json(&serde_json::json!("125000")).unwrap();
        assert_eq!(serde_json::to_string(&number).unwrap(), "125000");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"125000\"");
        assert!(Price::from_json(&serde_json::json!(null)).is_none());
        assert!(Price::from_json(&serde_json::json!({"a": 1})).is_none());
    }

    #[test]
    fn variant_name_is_trimmed() {
        let record = ProductRecord::default().with_variant_name("  Màu: Trắng ");
        assert_eq!(record.variant_name.as_deref(), Some("Màu: Trắng"));
    }

    #[test]
    fn default_record_is_empty() {
        assert!(ProductRecord::default().is_empty());
        let record = ProductRecord {
            sub_categories: vec!["Đèn".to_string()],
            ..Default::default()
        };
        assert!(!record.is_empty());
    }
}
