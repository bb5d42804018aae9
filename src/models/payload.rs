use serde::{Deserialize, Serialize};

use super::record::ProductRecord;

/// Body of the single import POST sent to the bridge endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPayload {
    pub supplier: String,
    pub title: String,
    pub price: String,
    pub description: String,
}

impl ImportPayload {
    /// Build a payload from the current record. Returns `None` while the
    /// record is missing title or price, so an incomplete extraction is
    /// never sent out.
    pub fn from_record(supplier: &str, record: &ProductRecord) -> Option<Self> {
        if !record.is_complete() {
            return None;
        }
        Some(ImportPayload {
            supplier: supplier.to_string(),
            title: record.title.clone(),
            price: record.price.clone(),
            description: record.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_complete_record() {
        let record = ProductRecord {
            title: "USB-C Hub".to_string(),
            price: "34.50".to_string(),
            description: "7-in-1".to_string(),
        };

        let payload = ImportPayload::from_record("aliexpress", &record).unwrap();
        assert_eq!(payload.supplier, "aliexpress");
        assert_eq!(payload.title, "USB-C Hub");
        assert_eq!(payload.price, "34.50");
    }

    #[test]
    fn test_incomplete_record_yields_no_payload() {
        let record = ProductRecord {
            title: "USB-C Hub".to_string(),
            price: String::new(),
            description: String::new(),
        };
        assert!(ImportPayload::from_record("aliexpress", &record).is_none());
    }

    #[test]
    fn test_payload_serialization() {
        let payload = ImportPayload {
            supplier: "aliexpress".to_string(),
            title: "USB-C Hub".to_string(),
            price: "34.50".to_string(),
            description: String::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["supplier"], "aliexpress");
        assert_eq!(json["price"], "34.50");
    }
}
