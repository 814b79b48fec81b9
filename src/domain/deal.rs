// src/domain/deal.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::domain::category::detect_category;
use crate::source::{RawItem, RawStore};

/// A store as observed in one fetch, flattened and normalized, ready for
/// reconciliation. This acts as an anti-corruption layer between the raw
/// source payload and our database rows.
#[derive(Debug, PartialEq, Clone)]
pub struct StoreRecord {
    pub external_id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StoreRecord {
    /// Validates that the store can be identified; everything else has a
    /// tolerant default.
    pub fn from_raw(raw: &RawStore) -> Result<Self, String> {
        let external_id = raw
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or("Missing or empty store id")?
            .to_string();

        Ok(StoreRecord {
            external_id,
            name: raw
                .name
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown Store")
                .to_string(),
            address: raw.address.as_ref().and_then(|a| a.full_address.clone()),
            latitude: raw.location.as_ref().and_then(|l| l.latitude),
            longitude: raw.location.as_ref().and_then(|l| l.longitude),
        })
    }
}

/// A deal listing as observed in one fetch, normalized for reconciliation.
#[derive(Debug, PartialEq, Clone)]
pub struct ProductRecord {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub original_price: f64,
    pub discount_price: f64,
    pub discount_percent: Option<i64>,
    pub quantity_available: i64,
    pub expiry_date: Option<NaiveDateTime>,
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// Normalizes a raw item. Price fields tolerate the source emitting
    /// numbers as strings or numerics; an unparsable price becomes `0.0`
    /// rather than failing the batch. An unparsable expiry is treated as
    /// absent. A missing item id is the only fatal condition.
    pub fn from_raw(raw: &RawItem) -> Result<Self, String> {
        let external_id = raw
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or("Missing or empty item id")?
            .to_string();

        let name = raw
            .name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown Item")
            .to_string();
        let description = raw.description.clone().filter(|s| !s.is_empty());

        let original_price = coerce_price(raw.original_price.as_ref());
        let discount_price = coerce_price(raw.price.as_ref());

        let discount_percent = if original_price > 0.0 {
            Some((100.0 * (original_price - discount_price) / original_price).round() as i64)
        } else {
            None
        };

        let expiry_date = raw.expiry_date.as_deref().and_then(parse_expiry);

        // The source frequently omits categories; fall back to keyword
        // detection so subscriber category filters still apply.
        let category = match raw.category.as_deref().filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => detect_category(&name, description.as_deref()).to_string(),
        };

        Ok(ProductRecord {
            external_id,
            name,
            description,
            category,
            original_price,
            discount_price,
            discount_percent,
            quantity_available: raw.quantity_available.unwrap_or(0),
            expiry_date,
            image_url: raw.image.as_ref().and_then(|i| i.url.clone()),
        })
    }
}

/// Coerces a raw JSON price (number, numeric string, or garbage) to `f64`.
fn coerce_price(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parses an ISO-8601 expiry timestamp (`Z`-suffixed in practice).
fn parse_expiry(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_item(json: Value) -> RawItem {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn normalizes_a_complete_item() {
        let item = raw_item(json!({
            "id": "item-1",
            "name": "Assorted Bakery Items",
            "description": "Mixed bread and pastry",
            "category": "Bakery",
            "originalPrice": 7.99,
            "price": 3.99,
            "quantityAvailable": 4,
            "expiryDate": "2026-08-10T00:00:00Z",
            "image": {"url": "https://img.example/1.jpg"}
        }));

        let record = ProductRecord::from_raw(&item).unwrap();
        assert_eq!(record.external_id, "item-1");
        assert_eq!(record.category, "Bakery");
        assert_eq!(record.original_price, 7.99);
        assert_eq!(record.discount_price, 3.99);
        // 100 * (7.99 - 3.99) / 7.99 = 50.06... -> 50
        assert_eq!(record.discount_percent, Some(50));
        assert_eq!(record.quantity_available, 4);
        assert!(record.expiry_date.is_some());
        assert_eq!(record.image_url.as_deref(), Some("https://img.example/1.jpg"));
    }

    #[test]
    fn tolerates_string_prices() {
        let item = raw_item(json!({
            "id": "item-2",
            "name": "Milk",
            "originalPrice": "5.00",
            "price": "2.50"
        }));

        let record = ProductRecord::from_raw(&item).unwrap();
        assert_eq!(record.original_price, 5.0);
        assert_eq!(record.discount_price, 2.5);
        assert_eq!(record.discount_percent, Some(50));
    }

    #[test]
    fn unparsable_price_defaults_to_zero() {
        let item = raw_item(json!({
            "id": "item-3",
            "name": "Mystery Box",
            "originalPrice": "n/a",
            "price": 1.99
        }));

        let record = ProductRecord::from_raw(&item).unwrap();
        assert_eq!(record.original_price, 0.0);
        // No original price means the percentage stays unset.
        assert_eq!(record.discount_percent, None);
    }

    #[test]
    fn bad_expiry_is_treated_as_absent() {
        let item = raw_item(json!({
            "id": "item-4",
            "name": "Cheese",
            "price": 2.0,
            "expiryDate": "tomorrow-ish"
        }));

        let record = ProductRecord::from_raw(&item).unwrap();
        assert_eq!(record.expiry_date, None);
    }

    #[test]
    fn missing_item_id_is_rejected() {
        let item = raw_item(json!({"name": "No id", "price": 1.0}));
        assert!(ProductRecord::from_raw(&item).is_err());
    }

    #[test]
    fn missing_category_falls_back_to_detection() {
        let item = raw_item(json!({
            "id": "item-5",
            "name": "Sourdough bread loaf",
            "price": 2.0
        }));

        let record = ProductRecord::from_raw(&item).unwrap();
        assert_eq!(record.category, "Bakery");
    }

    #[test]
    fn store_without_id_is_rejected() {
        let store: RawStore = serde_json::from_value(json!({"name": "Nameless"})).unwrap();
        assert!(StoreRecord::from_raw(&store).is_err());
    }

    #[test]
    fn store_defaults_and_flattening() {
        let store: RawStore = serde_json::from_value(json!({
            "id": "s-9",
            "address": {"fullAddress": "123 4th Ave NW, Calgary"},
            "location": {"latitude": 51.05, "longitude": -114.07}
        }))
        .unwrap();

        let record = StoreRecord::from_raw(&store).unwrap();
        assert_eq!(record.name, "Unknown Store");
        assert_eq!(record.address.as_deref(), Some("123 4th Ave NW, Calgary"));
        assert_eq!(record.latitude, Some(51.05));
    }
}
