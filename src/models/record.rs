use serde::{Deserialize, Serialize};

/// The single mutable snapshot of everything known about the product on the
/// current page. Initialized empty at page load, updated only through
/// [`ProductRecord::merge`], discarded on teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    /// Formatted to two decimal places, or empty when unresolved.
    pub price: String,
    pub description: String,
}

/// What a merge actually did to the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub changed: bool,
    pub price_changed: bool,
}

impl ProductRecord {
    /// Merge-if-present: a freshly resolved empty field never overwrites a
    /// previously known non-empty value. Some triggers fire before the page
    /// has re-rendered, so an empty intermediate read must not erase data.
    pub fn merge(&mut self, update: &ProductRecord) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        if !update.title.is_empty() && update.title != self.title {
            self.title = update.title.clone();
            outcome.changed = true;
        }
        if !update.description.is_empty() && update.description != self.description {
            self.description = update.description.clone();
            outcome.changed = true;
        }
        if !update.price.is_empty() && update.price != self.price {
            self.price = update.price.clone();
            outcome.changed = true;
            outcome.price_changed = true;
        }

        outcome
    }

    /// A record is submittable once both title and price are known.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.price.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> ProductRecord {
        ProductRecord {
            title: "Wireless Earbuds".to_string(),
            price: "19.99".to_string(),
            description: "Bluetooth 5.3".to_string(),
        }
    }

    #[test]
    fn test_merge_updates_all_fields() {
        let mut record = ProductRecord::default();
        let outcome = record.merge(&full_record());

        assert!(outcome.changed);
        assert!(outcome.price_changed);
        assert_eq!(record, full_record());
    }

    #[test]
    fn test_empty_update_never_clears_known_fields() {
        let mut record = full_record();
        let outcome = record.merge(&ProductRecord::default());

        assert!(!outcome.changed);
        assert!(!outcome.price_changed);
        assert_eq!(record, full_record());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut record = full_record();
        let outcome = record.merge(&full_record());

        assert!(!outcome.changed);
        assert!(!outcome.price_changed);
    }

    #[test]
    fn test_price_change_is_flagged() {
        let mut record = full_record();
        let mut update = full_record();
        update.price = "17.49".to_string();

        let outcome = record.merge(&update);
        assert!(outcome.changed);
        assert!(outcome.price_changed);
        assert_eq!(record.price, "17.49");
    }

    #[test]
    fn test_title_change_does_not_flag_price() {
        let mut record = full_record();
        let mut update = full_record();
        update.title = "Renamed Earbuds".to_string();

        let outcome = record.merge(&update);
        assert!(outcome.changed);
        assert!(!outcome.price_changed);
    }

    #[test]
    fn test_completeness() {
        assert!(full_record().is_complete());
        assert!(!ProductRecord::default().is_complete());

        let mut missing_price = full_record();
        missing_price.price.clear();
        assert!(!missing_price.is_complete());
    }
}
