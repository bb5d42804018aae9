use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{decimal_from_json, plausible};

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// First plausible price out of the page's JSON-LD blocks. This source is
/// high-trust, so the first valid hit wins without further scoring. A
/// malformed block is skipped without aborting the rest.
pub fn collect(doc: &Html) -> Option<Decimal> {
    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let parsed: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(e) => {
                debug!("skipping malformed ld+json block: {}", e);
                continue;
            }
        };

        if let Some(price) = items(&parsed).into_iter().find_map(item_price) {
            return Some(price);
        }
    }
    None
}

/// A block is a single item, a list of items, or a `@graph` wrapper.
fn items(root: &Value) -> Vec<&Value> {
    match root {
        Value::Array(list) => list.iter().collect(),
        Value::Object(map) => match map.get("@graph").and_then(Value::as_array) {
            Some(graph) => graph.iter().collect(),
            None => vec![root],
        },
        _ => Vec::new(),
    }
}

fn item_price(item: &Value) -> Option<Decimal> {
    let offers = item.get("offers")?;
    let offers: Vec<&Value> = match offers {
        Value::Array(list) => list.iter().collect(),
        other => vec![other],
    };
    offers.into_iter().find_map(offer_price)
}

fn offer_price(offer: &Value) -> Option<Decimal> {
    if let Some(price) = offer
        .get("price")
        .and_then(decimal_from_json)
        .filter(|p| plausible(*p))
    {
        return Some(price);
    }

    let spec = offer.get("priceSpecification")?;
    let specs: Vec<&Value> = match spec {
        Value::Array(list) => list.iter().collect(),
        other => vec![other],
    };
    specs.into_iter().find_map(|s| {
        s.get("price")
            .and_then(decimal_from_json)
            .filter(|p| plausible(*p))
    })
}
