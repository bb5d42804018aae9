use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use super::{plausible, PriceCandidate};
use crate::snapshot::MetricsOverlay;

/// Price container patterns, checked in order; all matches of the first
/// pattern that hits anything become the search roots.
const CONTAINER_PATTERNS: &[&str] = &[r#"[data-pl="product-price"]"#, r#"[class*="price"]"#];

/// Class/id hints used by the bounded document-order fallback scan.
const CONTAINER_HINTS: &[&str] = &["price", "cost", "amount", "total", "money"];

/// Ancestor class/id substrings marking a superseded, original, or
/// not-yet-active price.
const CROSSED_OUT_MARKERS: &[&str] = &[
    "original",
    "old",
    "preheat",
    "upcoming",
    "countdown",
    "strike",
    "cross",
    "del",
];

const STRIKE_TAGS: &[&str] = &["del", "s", "strike"];

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Collect price candidates from the rendered text of price-bearing
/// containers. Matches with exactly two fraction digits are the real price
/// pattern; bare integers and odd fractions only count when no
/// decimal-formatted match exists anywhere.
pub fn collect(
    doc: &Html,
    overlay: &MetricsOverlay,
    max_fallback_scan: usize,
) -> Vec<PriceCandidate> {
    let containers = find_containers(doc, max_fallback_scan);

    let mut seen_nodes = HashSet::new();
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut decimals = Vec::new();
    let mut loose = Vec::new();

    for container in containers {
        for node in container.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            // containers can nest; count each text node once
            if !seen_nodes.insert(node.id()) {
                continue;
            }
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            let occurrence = {
                let counter = occurrences.entry(trimmed.to_string()).or_insert(0);
                let current = *counter;
                *counter += 1;
                current
            };

            let Some(owner) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            let style = InferredStyle::compute(owner);
            let metrics = overlay.lookup(trimmed, occurrence);

            // thousands separators first, then numeric matching
            let normalized = trimmed.replace(',', "");
            for m in NUMBER_RE.find_iter(&normalized) {
                let Ok(value) = Decimal::from_str(m.as_str()) else {
                    continue;
                };
                if !plausible(value) {
                    continue;
                }

                let candidate = PriceCandidate {
                    value,
                    visible: metrics.map(|m| m.visible).unwrap_or(style.visible),
                    crossed_out: style.crossed_out
                        || metrics.map(|m| m.line_through).unwrap_or(false),
                    font_size: metrics.map(|m| m.font_size).unwrap_or(style.font_size),
                    font_weight: metrics.map(|m| m.font_weight).unwrap_or(style.font_weight),
                    rendered_area: metrics.map(|m| m.area).unwrap_or(0.0),
                };

                let two_fraction_digits = m
                    .as_str()
                    .split('.')
                    .nth(1)
                    .map(|f| f.len() == 2)
                    .unwrap_or(false);
                if two_fraction_digits {
                    decimals.push(candidate);
                } else {
                    loose.push(candidate);
                }
            }
        }
    }

    if decimals.is_empty() { loose } else { decimals }
}

/// Filter and rank scored candidates. Crossed-out candidates are discarded
/// outright: sale UIs universally strike through the superseded price.
/// Visibility detection can false-negative on some rendering paths, so an
/// all-invisible pool degrades to the full remaining set instead of
/// returning nothing.
pub fn pick(candidates: Vec<PriceCandidate>) -> Option<Decimal> {
    let mut pool: Vec<_> = candidates.into_iter().filter(|c| !c.crossed_out).collect();
    if pool.is_empty() {
        return None;
    }
    if pool.iter().any(|c| c.visible) {
        pool.retain(|c| c.visible);
    }

    // larger area, then larger font, then heavier weight; among visually
    // tied candidates the smaller number is the charged price
    pool.into_iter()
        .max_by(|a, b| {
            a.rendered_area
                .total_cmp(&b.rendered_area)
                .then(a.font_size.total_cmp(&b.font_size))
                .then(a.font_weight.cmp(&b.font_weight))
                .then(b.value.cmp(&a.value))
        })
        .map(|c| c.value)
}

fn find_containers<'a>(doc: &'a Html, max_fallback_scan: usize) -> Vec<ElementRef<'a>> {
    for pattern in CONTAINER_PATTERNS {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        let found: Vec<ElementRef<'a>> = doc.select(&selector).collect();
        if !found.is_empty() {
            return found;
        }
    }

    doc.root_element()
        .descendants()
        .take(max_fallback_scan)
        .filter_map(ElementRef::wrap)
        .filter(|el| {
            let haystack = class_id_text(el);
            CONTAINER_HINTS.iter().any(|hint| haystack.contains(hint))
        })
        .collect()
}

fn class_id_text(el: &ElementRef) -> String {
    let class = el.value().attr("class").unwrap_or_default();
    let id = el.value().attr("id").unwrap_or_default();
    format!("{} {}", class, id).to_lowercase()
}

/// Style signals inferred from markup alone: strike tags, inline styles,
/// denylisted ancestor classes, aria-hidden. Used whenever the snapshot has
/// no rendered metrics for a leaf.
#[derive(Debug, Clone)]
struct InferredStyle {
    visible: bool,
    crossed_out: bool,
    font_size: f64,
    font_weight: u32,
}

impl InferredStyle {
    fn compute(element: ElementRef) -> Self {
        let mut visible = true;
        let mut crossed_out = false;
        let mut font_size = None;
        let mut font_weight = None;

        let chain = std::iter::once(element).chain(
            element
                .ancestors()
                .filter_map(ElementRef::wrap),
        );

        for el in chain {
            let tag = el.value().name();
            let decls = inline_decls(el);

            if STRIKE_TAGS.contains(&tag) {
                crossed_out = true;
            }
            let haystack = class_id_text(&el);
            if CROSSED_OUT_MARKERS.iter().any(|m| haystack.contains(m)) {
                crossed_out = true;
            }

            if el.value().attr("aria-hidden") == Some("true") || el.value().attr("hidden").is_some()
            {
                visible = false;
            }

            for (prop, value) in &decls {
                match prop.as_str() {
                    "display" if value == "none" => visible = false,
                    "visibility" if value == "hidden" => visible = false,
                    "opacity" => {
                        if value.parse::<f64>().map(|o| o < 0.03).unwrap_or(false) {
                            visible = false;
                        }
                    }
                    "text-decoration" | "text-decoration-line" => {
                        if value.contains("line-through") {
                            crossed_out = true;
                        }
                    }
                    "font-size" if font_size.is_none() => {
                        font_size = parse_px(value);
                    }
                    "font-weight" if font_weight.is_none() => {
                        font_weight = Some(parse_weight(value));
                    }
                    _ => {}
                }
            }

            if font_weight.is_none() && matches!(tag, "b" | "strong") {
                font_weight = Some(700);
            }
            if font_size.is_none() {
                font_size = default_font_size(tag);
            }
        }

        InferredStyle {
            visible,
            crossed_out,
            font_size: font_size.unwrap_or(16.0),
            font_weight: font_weight.unwrap_or(400),
        }
    }
}

fn inline_decls(el: ElementRef) -> Vec<(String, String)> {
    el.value()
        .attr("style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            Some((
                prop.trim().to_lowercase(),
                value.trim().to_lowercase(),
            ))
        })
        .collect()
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim_end_matches("px").trim().parse().ok()
}

/// Textual "bold" normalizes to 700; anything unparseable falls back to 400.
fn parse_weight(value: &str) -> u32 {
    match value {
        "bold" | "bolder" => 700,
        other => other.parse().unwrap_or(400),
    }
}

fn default_font_size(tag: &str) -> Option<f64> {
    match tag {
        "h1" => Some(32.0),
        "h2" => Some(24.0),
        "h3" => Some(18.0),
        "small" => Some(13.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::LeafMetrics;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn resolve(html: &str) -> Option<Decimal> {
        let doc = Html::parse_document(html);
        pick(collect(&doc, &MetricsOverlay::default(), 400))
    }

    #[test]
    fn test_discount_strikethrough_excluded() {
        let html = r#"<html><body><div class="product-price">
            <del>$25.00</del><span>$19.99</span>
        </div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("19.99"));
    }

    #[test]
    fn test_price_range_resolves_minimum() {
        let html = r#"<html><body><div class="price">$12.00 - $18.50</div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("12.00"));
    }

    #[test]
    fn test_denylisted_ancestor_class_excluded() {
        let html = r#"<html><body><div class="price">
            <span class="price-original">$40.00</span>
            <span class="price-now">$29.99</span>
        </div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("29.99"));
    }

    #[test]
    fn test_line_through_inline_style_excluded() {
        let html = r#"<html><body><div class="price">
            <span style="text-decoration: line-through">$99.00</span>
            <span>$79.00</span>
        </div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("79.00"));
    }

    #[test]
    fn test_all_crossed_out_yields_none() {
        let html = r#"<html><body><div class="price"><del>$25.00</del></div></body></html>"#;
        assert!(resolve(html).is_none());
    }

    #[test]
    fn test_invisible_only_pool_degrades_gracefully() {
        let html = r#"<html><body><div class="price">
            <span style="display: none">$14.99</span>
        </div></body></html>"#;
        // visibility false-negatives must not turn into "no price"
        assert_eq!(resolve(html).unwrap(), dec("14.99"));
    }

    #[test]
    fn test_visible_candidate_preferred_over_hidden() {
        let html = r#"<html><body><div class="price">
            <span style="display: none">$8.00</span>
            <span>$9.50</span>
        </div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("9.50"));
    }

    #[test]
    fn test_aria_hidden_ancestor_is_invisible() {
        let html = r#"<html><body><div class="price">
            <div aria-hidden="true"><span>$5.25</span></div>
            <span>$6.75</span>
        </div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("6.75"));
    }

    #[test]
    fn test_larger_inline_font_wins_over_smaller() {
        let html = r#"<html><body><div class="price">
            <span style="font-size: 28px">$22.00</span>
            <span style="font-size: 12px">$3.99</span>
        </div></body></html>"#;
        // shipping-style small print loses to the prominent price
        assert_eq!(resolve(html).unwrap(), dec("22.00"));
    }

    #[test]
    fn test_thousands_separators_normalized() {
        let html = r#"<html><body><div class="price">$1,299.99</div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("1299.99"));
    }

    #[test]
    fn test_implausible_values_rejected() {
        let html =
            r#"<html><body><div class="price">SKU 100001 · $0.05 · $49.99</div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("49.99"));
    }

    #[test]
    fn test_integer_fallback_when_no_decimal_match() {
        let html = r#"<html><body><div class="price">US $35</div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("35"));
    }

    #[test]
    fn test_data_pl_container_preferred_over_class_pattern() {
        let html = r#"<html><body>
            <div data-pl="product-price">$17.80</div>
            <div class="old-price-elsewhere">$90.00</div>
        </body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("17.80"));
    }

    #[test]
    fn test_fallback_scan_finds_hinted_id() {
        let html = r#"<html><body><div id="amount-box"><span>$11.11</span></div></body></html>"#;
        assert_eq!(resolve(html).unwrap(), dec("11.11"));
    }

    #[test]
    fn test_no_price_text_yields_none() {
        let html = r#"<html><body><div class="price">Contact seller</div></body></html>"#;
        assert!(resolve(html).is_none());
    }

    #[test]
    fn test_overlay_metrics_outrank_static_inference() {
        let html = r#"<html><body><div class="price">
            <span>$30.00</span><span>$24.99</span>
        </div></body></html>"#;
        let overlay = MetricsOverlay::new(vec![
            LeafMetrics {
                text: "$30.00".to_string(),
                font_size: 14.0,
                font_weight: 400,
                area: 200.0,
                visible: true,
                line_through: true,
            },
            LeafMetrics {
                text: "$24.99".to_string(),
                font_size: 26.0,
                font_weight: 700,
                area: 1200.0,
                visible: true,
                line_through: false,
            },
        ]);
        let doc = Html::parse_document(html);
        let picked = pick(collect(&doc, &overlay, 400));
        assert_eq!(picked.unwrap(), dec("24.99"));
    }

    #[test]
    fn test_nested_containers_do_not_duplicate_candidates() {
        let html = r#"<html><body><div class="price-wrap">
            <div class="price"><span>$10.00</span></div>
        </div></body></html>"#;
        let doc = Html::parse_document(html);
        let candidates = collect(&doc, &MetricsOverlay::default(), 400);
        assert_eq!(candidates.len(), 1);
    }
}
