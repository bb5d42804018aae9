use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{decimal_from_json, plausible};
use crate::snapshot::PageSnapshot;

/// Global state object names the page is known to expose, probed in order.
pub const STATE_OBJECTS: &[&str] = &[
    "__AER_DATA__",
    "runParams",
    "__runParams__",
    "runData",
    "run_model",
];

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// All plausible prices exposed by the first known state object found. The
/// caller takes the minimum: these objects routinely carry both original and
/// discounted prices, and the discounted one is the charged one.
pub fn collect(snapshot: &PageSnapshot, doc: &Html) -> Vec<Decimal> {
    match find_state(snapshot, doc) {
        Some(root) => prices_from_state(&root),
        None => Vec::new(),
    }
}

/// Minimum plausible state price, the value the reconciliation loop's state
/// poll compares across reads.
pub fn min_price(snapshot: &PageSnapshot, doc: &Html) -> Option<Decimal> {
    collect(snapshot, doc).into_iter().min()
}

fn find_state(snapshot: &PageSnapshot, doc: &Html) -> Option<Value> {
    // Blobs handed over by the live capture take precedence; a static
    // snapshot falls back to digging the assignments out of inline scripts.
    for name in STATE_OBJECTS {
        if let Some(blob) = snapshot
            .state_blobs()
            .iter()
            .find(|b| b.name == *name && !b.value.is_null())
        {
            return Some(blob.value.clone());
        }
    }
    scan_inline_scripts(doc)
}

fn scan_inline_scripts(doc: &Html) -> Option<Value> {
    let scripts: Vec<String> = doc.select(&SCRIPT).map(|s| s.text().collect()).collect();
    for name in STATE_OBJECTS {
        for script in &scripts {
            if let Some(value) = extract_assignment(script, name) {
                debug!("found page state object {} in inline script", name);
                return Some(value);
            }
        }
    }
    None
}

/// Locate `name = { ... }` in script text and parse the balanced-brace
/// object that follows. Handles `window.runParams = {...}` as well as
/// `var runParams = {...}`.
fn extract_assignment(script: &str, name: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(found) = script[search_from..].find(name) {
        let after = search_from + found + name.len();
        search_from = after;

        let rest = script[after..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        if !rest.starts_with('{') {
            continue;
        }
        if let Some(object) = balanced_object(rest) {
            if let Ok(value) = serde_json::from_str(object) {
                return Some(value);
            }
        }
    }
    None
}

/// The prefix of `text` that forms one brace-balanced object, respecting
/// string literals and escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Known nested price paths, every probe independently fault-isolated:
/// absent fields simply contribute nothing.
fn prices_from_state(root: &Value) -> Vec<Decimal> {
    let mut out = Vec::new();

    if let Some(list) = root
        .pointer("/skuModule/skuPriceList")
        .and_then(Value::as_array)
    {
        for entry in list {
            let price = entry
                .pointer("/skuVal/skuPrice")
                .or_else(|| entry.get("skuPrice"))
                .or_else(|| entry.get("price"));
            push_plausible(&mut out, price);
        }
    }

    if let Some(pm) = root.get("priceModule") {
        let probes = [
            pm.pointer("/activityPrice/value"),
            pm.pointer("/discountPrice/value"),
            pm.get("minPrice"),
            pm.get("maxPrice"),
            pm.get("price"),
        ];
        for probe in probes {
            push_plausible(&mut out, probe);
        }
    }

    if let Some(list) = root.get("skuPriceList").and_then(Value::as_array) {
        for entry in list {
            push_plausible(&mut out, Some(entry));
        }
    }

    out
}

fn push_plausible(out: &mut Vec<Decimal>, value: Option<&Value>) {
    if let Some(price) = value.and_then(decimal_from_json) {
        if plausible(price) {
            out.push(price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn empty_doc() -> Html {
        Html::parse_document("<html><body></body></html>")
    }

    #[test]
    fn test_price_module_min_max() {
        let snap = PageSnapshot::from_html("")
            .with_state("runParams", json!({"priceModule": {"minPrice": 7.5, "maxPrice": 12.0}}));
        let doc = empty_doc();

        let prices = collect(&snap, &doc);
        assert_eq!(prices, vec![dec("7.5"), dec("12.0")]);
        assert_eq!(min_price(&snap, &doc).unwrap(), dec("7.5"));
    }

    #[test]
    fn test_sku_price_list_variants() {
        let state = json!({
            "skuModule": {"skuPriceList": [
                {"skuVal": {"skuPrice": "US $11.20"}},
                {"skuPrice": 9.80},
                {"price": "8.15"},
                {"unrelated": true}
            ]}
        });
        let snap = PageSnapshot::from_html("").with_state("__AER_DATA__", state);

        let prices = collect(&snap, &empty_doc());
        assert_eq!(prices, vec![dec("11.20"), dec("9.80"), dec("8.15")]);
    }

    #[test]
    fn test_top_level_sku_price_list() {
        let snap = PageSnapshot::from_html("")
            .with_state("runData", json!({"skuPriceList": ["6.99", 5.49, "n/a"]}));

        let prices = collect(&snap, &empty_doc());
        assert_eq!(prices, vec![dec("6.99"), dec("5.49")]);
    }

    #[test]
    fn test_implausible_state_values_dropped() {
        let snap = PageSnapshot::from_html("").with_state(
            "runParams",
            json!({"priceModule": {"minPrice": 0.1, "maxPrice": 250000, "price": 19.99}}),
        );
        assert_eq!(collect(&snap, &empty_doc()), vec![dec("19.99")]);
    }

    #[test]
    fn test_state_name_priority() {
        let snap = PageSnapshot::from_html("")
            .with_state("runData", json!({"priceModule": {"price": 30.0}}))
            .with_state("__AER_DATA__", json!({"priceModule": {"price": 20.0}}));
        // __AER_DATA__ outranks runData regardless of insertion order
        assert_eq!(min_price(&snap, &empty_doc()).unwrap(), dec("20.0"));
    }

    #[test]
    fn test_inline_script_assignment() {
        let html = r#"<html><body><script>
            window.runParams = {"priceModule": {"minPrice": 4.25, "maxPrice": 6.75}};
            doSomethingElse();
        </script></body></html>"#;
        let snap = PageSnapshot::from_html(html);
        let doc = snap.document();

        assert_eq!(min_price(&snap, &doc).unwrap(), dec("4.25"));
    }

    #[test]
    fn test_balanced_object_respects_strings() {
        let text = r#"{"a": "has } brace", "b": {"c": 1}} trailing"#;
        assert_eq!(
            balanced_object(text).unwrap(),
            r#"{"a": "has } brace", "b": {"c": 1}}"#
        );
    }

    #[test]
    fn test_unterminated_object_is_none() {
        assert!(balanced_object(r#"{"a": {"b": 1}"#).is_none());
    }

    #[test]
    fn test_no_state_anywhere() {
        let snap = PageSnapshot::from_html("<html><body><script>var x = 1;</script></body></html>");
        let doc = snap.document();
        assert!(collect(&snap, &doc).is_empty());
        assert!(min_price(&snap, &doc).is_none());
    }
}
