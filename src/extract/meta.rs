use rust_decimal::Decimal;
use scraper::{Html, Selector};

use super::{coerce_decimal, plausible};

/// Known metadata probes, highest trust first. Each reads the `content`
/// attribute when present, falling back to element text for the itemprop
/// case where sites put the amount in the node body.
const META_PROBES: &[&str] = &[
    r#"[itemprop="price"]"#,
    r#"meta[property="og:price:amount"]"#,
    r#"meta[property="product:price:amount"]"#,
    r#"meta[name="twitter:data1"]"#,
];

/// First plausible numeric value from the fixed probe list.
pub fn collect(doc: &Html) -> Option<Decimal> {
    for probe in META_PROBES {
        let Ok(selector) = Selector::parse(probe) else {
            continue;
        };
        for element in doc.select(&selector) {
            let raw = element
                .value()
                .attr("content")
                .map(str::to_string)
                .unwrap_or_else(|| element.text().collect());
            if let Some(value) = coerce_decimal(&raw).filter(|v| plausible(*v)) {
                return Some(value);
            }
        }
    }
    None
}
