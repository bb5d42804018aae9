use rust_decimal::Decimal;
use tracing::debug;

use super::{first_match, format_price, meta, plausible, state, structured, visual};
use crate::config::ExtractionConfig;
use crate::snapshot::PageSnapshot;

/// Orchestrates the candidate sources in a fixed trust order: structured
/// metadata, then meta tags, then the scored visual DOM, then page state.
/// The first source yielding a plausible candidate wins outright; results
/// are never blended across sources.
#[derive(Debug, Clone)]
pub struct PriceResolver {
    max_fallback_scan: usize,
}

impl Default for PriceResolver {
    fn default() -> Self {
        PriceResolver::new(&ExtractionConfig::default())
    }
}

impl PriceResolver {
    pub fn new(config: &ExtractionConfig) -> Self {
        PriceResolver {
            max_fallback_scan: config.max_fallback_scan,
        }
    }

    pub fn resolve(&self, snapshot: &PageSnapshot) -> Option<Decimal> {
        let doc = snapshot.document();
        let overlay = snapshot.overlay();

        let strategies: Vec<Box<dyn FnOnce() -> Option<Decimal> + '_>> = vec![
            Box::new(|| structured::collect(&doc)),
            Box::new(|| meta::collect(&doc)),
            Box::new(|| visual::pick(visual::collect(&doc, overlay, self.max_fallback_scan))),
            // state objects carry no layout signal; minimum-of-candidates is
            // the discounted, currently-charged price
            Box::new(|| state::min_price(snapshot, &doc)),
        ];

        let price = first_match(strategies, |price: &Decimal| plausible(*price));
        match price {
            Some(price) => debug!(%price, "price resolved"),
            None => debug!("no source yielded a plausible price"),
        }
        price
    }

    /// Two-decimal formatted price, or empty when nothing resolved.
    pub fn resolve_formatted(&self, snapshot: &PageSnapshot) -> String {
        self.resolve(snapshot).map(format_price).unwrap_or_default()
    }
}
