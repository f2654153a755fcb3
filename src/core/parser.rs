use crate::domain::model::{lenient_string, LineItem, Posting, TransformResult};
use serde_json::Value;
use std::collections::HashSet;

/// Flattens one posting into its product lines. Never fails: missing or
/// malformed fields degrade to `""` / `0`.
pub fn flatten(posting: &Posting) -> Vec<LineItem> {
    posting
        .products
        .iter()
        .map(|product| LineItem {
            posting_number: posting.posting_number.clone(),
            offer_id: lenient_string(product.get("offer_id")),
            product_name: product_name(product),
            sku: lenient_string(product.get("sku")),
            quantity: quantity(product.get("quantity")),
            picture_url: lenient_string(product.get("picture_url")),
        })
        .collect()
}

/// Flattens every posting in order and collects the distinct non-empty
/// posting numbers alongside.
pub fn flatten_all(postings: &[Posting]) -> TransformResult {
    let mut seen = HashSet::new();
    let mut result = TransformResult::default();

    for posting in postings {
        result.line_items.extend(flatten(posting));
        if !posting.posting_number.is_empty() && seen.insert(posting.posting_number.as_str()) {
            result.posting_numbers.push(posting.posting_number.clone());
        }
    }

    result
}

fn product_name(product: &Value) -> String {
    // 部分 API 版本使用 "name"
    let name = lenient_string(product.get("product_name"));
    if name.is_empty() {
        lenient_string(product.get("name"))
    } else {
        name
    }
}

fn quantity(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}
