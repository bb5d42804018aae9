use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::str::FromStr;

pub mod meta;
pub mod resolver;
pub mod state;
pub mod structured;
pub mod visual;

pub use resolver::PriceResolver;

/// Lower plausibility bound. Anything under half a currency unit is noise:
/// quantity counts, rating fractions, percentages-as-decimals.
pub static MIN_PLAUSIBLE: Lazy<Decimal> = Lazy::new(|| Decimal::new(50, 2));

/// Upper plausibility bound (exclusive). Guards against SKU numbers and
/// year-like integers being misread as prices.
pub static MAX_PLAUSIBLE: Lazy<Decimal> = Lazy::new(|| Decimal::new(100_000, 0));

pub fn plausible(value: Decimal) -> bool {
    value >= *MIN_PLAUSIBLE && value < *MAX_PLAUSIBLE
}

/// One numeric price value found by a probe, with the contextual metadata
/// used for ranking. Produced fresh on every resolution pass and discarded
/// with it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCandidate {
    pub value: Decimal,
    pub visible: bool,
    pub crossed_out: bool,
    pub font_size: f64,
    pub font_weight: u32,
    pub rendered_area: f64,
}

impl PriceCandidate {
    /// A candidate from a source without layout context (state objects,
    /// metadata). Neutral ranking signals, never crossed out.
    pub fn bare(value: Decimal) -> Self {
        PriceCandidate {
            value,
            visible: true,
            crossed_out: false,
            font_size: 0.0,
            font_weight: 400,
            rendered_area: 0.0,
        }
    }
}

/// Ordered-fallback combinator shared by price and field resolution: run
/// strategies in priority order, first value the acceptor keeps wins.
pub fn first_match<T, S, I, F>(strategies: I, accept: F) -> Option<T>
where
    I: IntoIterator<Item = S>,
    S: FnOnce() -> Option<T>,
    F: Fn(&T) -> bool,
{
    strategies
        .into_iter()
        .find_map(|strategy| strategy().filter(|value| accept(value)))
}

/// Numeric coercion used for state-object and metadata values: strip every
/// character that is not a digit or a dot, then parse.
pub fn coerce_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Coercion for JSON values that may carry a price as number or string.
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => coerce_decimal(s),
        _ => None,
    }
}

/// Two-decimal output formatting; the shape every consumer sees.
pub fn format_price(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}
