//! Product and breadcrumb structured data (JSON-LD script blocks).

use scraper::{Html, Selector};
use serde_json::Value;
use thiserror::Error;

use crate::models::{clean_text, Price, ProductRecord};

#[derive(Debug, Error)]
pub enum StructuredDataError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Categories taken from a breadcrumb trail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories {
    pub main_category: Option<String>,
    pub sub_categories: Vec<String>,
}

/// Raw text of the first element matching `selector`.
pub fn script_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_object(json: &str) -> Result<serde_json::Map<String, Value>, StructuredDataError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(StructuredDataError::NotAnObject(kind(&other))),
    }
}

/// A scalar as text: strings verbatim, numbers in their JSON form.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-blank string of a value that may be a list.
fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(first_text),
        Value::Object(map) => map.get("url").and_then(first_text),
        other => scalar_text(other).and_then(|s| clean_text(&s)),
    }
}

fn offer_price(offers: &Value) -> Option<Price> {
    match offers {
        Value::Array(items) => items.iter().find_map(offer_price),
        Value::Object(map) => map.get("price").and_then(Price::from_json),
        _ => None,
    }
}

/// Fields of the product JSON-LD block. Missing fields stay absent.
pub fn parse_product(json: &str) -> Result<ProductRecord, StructuredDataError> {
    let data = parse_object(json)?;
    let text = |key: &str| data.get(key).and_then(scalar_text);

    Ok(ProductRecord {
        name: text("name").and_then(|s| clean_text(&s)),
        url: text("url").and_then(|s| clean_text(&s)),
        sku: text("sku"),
        product_id: text("productID"),
        image: data.get("image").and_then(first_text),
        price: data.get("offers").and_then(offer_price),
        description: text("description"),
        ..Default::default()
    })
}

/// Categories from the breadcrumb JSON-LD block.
///
/// The first crumb is the home page. With three or more crumbs the second is
/// the main category and everything between it and the last crumb (the
/// product itself) are sub-categories. With exactly two crumbs only the main
/// category is known.
pub fn parse_breadcrumbs(json: &str) -> Result<Categories, StructuredDataError> {
    let data = parse_object(json)?;
    let names: Vec<Option<String>> = match data.get("itemListElement") {
        Some(Value::Array(items)) => items.iter().map(crumb_name).collect(),
        _ => Vec::new(),
    };

    let categories = match names.len() {
        0 | 1 => Categories::default(),
        2 => Categories {
            main_category: names[1].clone(),
            sub_categories: Vec::new(),
        },
        n => Categories {
            main_category: names[1].clone(),
            sub_categories: names[2..n - 1].iter().flatten().cloned().collect(),
        },
    };
    Ok(categories)
}

fn crumb_name(crumb: &Value) -> Option<String> {
    let name = crumb
        .get("name")
        .or_else(|| crumb.get("item").and_then(|item| item.get("name")))?;
    scalar_text(name).and_then(|s| clean_text(&s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_fields_are_read() {
        let record = parse_product(
            r#"{
                "@context": "https://schema.org",
                "@type": "Product",
                "name": "  Đèn LED Bulb 9W  ",
                "url": "https://rangdongstore.vn/den-led-bulb-p-101",
                "sku": "LED-A60-9W",
                "productID": 101,
                "image": ["", "https://cdn.rangdongstore.vn/a.jpg", "https://cdn.rangdongstore.vn/b.jpg"],
                "offers": {"@type": "Offer", "price": 45000, "priceCurrency": "VND"},
                "description": "Bóng đèn tiết kiệm điện"
            }"#,
        )
        .unwrap();

        assert_eq!(record.name.as_deref(), Some("Đèn LED Bulb 9W"));
        assert_eq!(record.sku.as_deref(), Some("LED-A60-9W"));
        assert_eq!(record.product_id.as_deref(), Some("101"));
        assert_eq!(record.image.as_deref(), Some("https://cdn.rangdongstore.vn/a.jpg"));
        assert_eq!(record.price, Some(Price::Number(45000.into())));
        assert_eq!(record.description.as_deref(), Some("Bóng đèn tiết kiệm điện"));
    }

    #[test]
    fn string_price_stays_a_string() {
        let record = parse_product(r#"{"offers": [{"price": "45000.00"}]}"#).unwrap();
        assert_eq!(record.price, Some(Price::Text("45000.00".to_string())));
    }

    #[test]
    fn missing_fields_stay_absent() {
        let record = parse_product(r#"{"name": "Phích"}"#).unwrap();
        assert_eq!(record.name.as_deref(), Some("Phích"));
        assert!(record.sku.is_none());
        assert!(record.price.is_none());
        assert!(record.image.is_none());
    }

    #[test]
    fn malformed_product_json_is_an_error() {
        assert!(matches!(parse_product("{not json"), Err(StructuredDataError::Json(_))));
        assert!(matches!(
            parse_product("[1, 2]"),
            Err(StructuredDataError::NotAnObject("an array"))
        ));
    }

    fn crumbs(names: &[&str]) -> String {
        let items: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                serde_json::json!({"@type": "ListItem", "position": i + 1, "name": name})
            })
            .collect();
        serde_json::json!({"@type": "BreadcrumbList", "itemListElement": items}).to_string()
    }

    #[test]
    fn breadcrumbs_with_sub_categories() {
        let categories =
            parse_breadcrumbs(&crumbs(&["Trang chủ", "Đèn LED", "Bóng đèn", " LED Bulb ", "Đèn 9W"]))
                .unwrap();
        assert_eq!(categories.main_category.as_deref(), Some("Đèn LED"));
        assert_eq!(categories.sub_categories, vec!["Bóng đèn", "LED Bulb"]);
    }

    #[test]
    fn three_crumbs_have_no_sub_categories() {
        let categories = parse_breadcrumbs(&crumbs(&["Home", "Lighting", "Bulb"])).unwrap();
        assert_eq!(categories.main_category.as_deref(), Some("Lighting"));
        assert!(categories.sub_categories.is_empty());
    }

    #[test]
    fn two_crumbs_give_main_category_only() {
        let categories = parse_breadcrumbs(&crumbs(&["Home", "Lighting"])).unwrap();
        assert_eq!(categories.main_category.as_deref(), Some("Lighting"));
        assert!(categories.sub_categories.is_empty());
    }

    #[test]
    fn short_trail_has_no_categories() {
        assert_eq!(parse_breadcrumbs(&crumbs(&["Home"])).unwrap(), Categories::default());
        assert_eq!(parse_breadcrumbs("{}").unwrap(), Categories::default());
    }

    #[test]
    fn nested_item_names_are_used() {
        let json = r#"{"itemListElement": [
            {"item": {"name": "Home"}},
            {"item": {"@id": "/c", "name": "Lighting"}}
        ]}"#;
        let categories = parse_breadcrumbs(json).unwrap();
        assert_eq!(categories.main_category.as_deref(), Some("Lighting"));
    }

    #[test]
    fn script_text_reads_first_match() {
        let html = Html::parse_document(
            r#"<html><head><script id="product-structured-data-script" type="application/ld+json">{"sku": "A"}</script></head></html>"#,
        );
        let selector = Selector::parse("#product-structured-data-script").unwrap();
        assert_eq!(script_text(&html, &selector).as_deref(), Some(r#"{"sku": "A"}"#));
    }
}
