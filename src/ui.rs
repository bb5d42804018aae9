use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::models::ProductRecord;

/// Consumer of accepted record changes. `price_changed` carries the flash
/// semantics: the badge only pulses when the displayed amount moved.
pub trait UiSink: Send + Sync {
    fn product_updated(&self, record: &ProductRecord, price_changed: bool);
}

/// Stands in for the injected page UI. Owns the one process-wide injection
/// guard: initialization triggers can re-fire (ready events, SPA
/// navigations re-entering the same document), and the surface must only be
/// set up once per page lifetime.
#[derive(Debug, Default)]
pub struct UiBridge {
    injected: AtomicBool,
}

impl UiBridge {
    pub fn new() -> Self {
        UiBridge::default()
    }

    /// Idempotent: returns `true` only for the first call. The flag is
    /// never cleared within a page lifetime.
    pub fn inject(&self) -> bool {
        let first = self
            .injected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            info!("ui surface injected");
        } else {
            debug!("ui surface already injected, ignoring repeated init");
        }
        first
    }

    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::SeqCst)
    }
}

impl UiSink for UiBridge {
    fn product_updated(&self, record: &ProductRecord, price_changed: bool) {
        if !self.is_injected() {
            return;
        }
        if price_changed {
            info!(price = %record.price, title = %record.title, "price updated, flashing badge");
        } else {
            debug!(title = %record.title, "product record updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injection_guard_sets_exactly_once() {
        let bridge = UiBridge::new();
        assert!(!bridge.is_injected());

        assert!(bridge.inject());
        assert!(!bridge.inject());
        assert!(!bridge.inject());
        assert!(bridge.is_injected());
    }

    #[test]
    fn test_updates_before_injection_are_dropped() {
        let bridge = UiBridge::new();
        let record = ProductRecord {
            title: "x".to_string(),
            price: "1.00".to_string(),
            description: String::new(),
        };
        // must not panic or log-crash; just a no-op
        bridge.product_updated(&record, true);
        bridge.inject();
        bridge.product_updated(&record, true);
    }
}
