use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

// store
//  ├── id
//  ├── name
//  ├── address
//  │    └── fullAddress
//  ├── location
//  │    ├── latitude
//  │    └── longitude
//  └── items[]
//       ├── id
//       ├── name
//       ├── description
//       ├── category
//       ├── originalPrice   (number OR string)
//       ├── price           (number OR string)
//       ├── quantityAvailable
//       ├── expiryDate      (ISO-8601, Z-suffixed)
//       └── image
//            └── url

/// `GET /stores` envelope.
#[derive(Debug, Deserialize)]
pub struct StoresEnvelope {
    pub data: Option<Vec<RawStore>>,
}

/// `GET /items/` envelope: items keyed by store external id.
#[derive(Debug, Deserialize)]
pub struct ItemsEnvelope {
    pub data: Option<HashMap<String, Vec<RawItem>>>,
}

#[derive(Debug, Deserialize)]
pub struct RawStore {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<RawAddress>,
    pub location: Option<RawLocation>,
    pub items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
pub struct RawAddress {
    #[serde(rename = "fullAddress")]
    pub full_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    // The source emits prices either as numbers or as strings; kept raw
    // here and coerced during normalization.
    #[serde(rename = "originalPrice")]
    pub original_price: Option<Value>,
    pub price: Option<Value>,
    #[serde(rename = "quantityAvailable")]
    pub quantity_available: Option<i64>,
    #[serde(rename = "expiryDate")]
    pub expiry_date: Option<String>,
    pub image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
pub struct RawImage {
    pub url: Option<String>,
}
