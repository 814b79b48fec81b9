// source/client.rs
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::config::{Config, Locality};
use crate::source::cache::ResponseCache;
use crate::source::models::{ItemsEnvelope, RawItem, RawStore, StoresEnvelope};
use crate::source::SourceError;

// Header set mimicking the iOS shopper app; the API rejects unknown clients.
const USER_AGENT: &str = "Flashfood/35155 CFNetwork/3826.600.41 Darwin/24.6.0";
const APP_INFO: &str = "app/shopper,appversion/3.2.6,appbuild/35155,os/ios,osversion/18.6.1,devicemodel/Apple_iPhone14_5,deviceid/unknown";

/// Client for the reverse-engineered Flashfood shopper API.
pub struct FlashfoodClient {
    client: Client,
    base_url: String,
    api_key: String,
    radius_meters: i64,
    stores_limit: i64,
    cache: ResponseCache,
}

impl FlashfoodClient {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.source_base_url.trim_end_matches('/').to_string(),
            api_key: config.source_api_key.clone(),
            radius_meters: config.search_radius_meters,
            stores_limit: config.stores_limit,
            cache: ResponseCache::new(Duration::from_secs(config.poll_interval_secs)),
        })
    }

    /// Fetches stores within the configured radius of a locality, with
    /// their current item listings inlined.
    pub fn fetch_stores_near(&self, locality: &Locality) -> Result<Vec<RawStore>, SourceError> {
        let cache_key = format!(
            "stores:{}:{}:{}:{}",
            locality.lat, locality.lon, self.radius_meters, self.stores_limit
        );

        let url = format!("{}/stores", self.base_url);
        let mut params = HashMap::new();
        params.insert("storesWithItemsLimit", self.stores_limit.to_string());
        params.insert("includeItems", "true".to_string());
        params.insert("searchLatitude", locality.lat.to_string());
        params.insert("searchLongitude", locality.lon.to_string());
        params.insert("userLocationLatitude", locality.lat.to_string());
        params.insert("userLocationLongitude", locality.lon.to_string());
        params.insert("maxDistance", self.radius_meters.to_string());

        let body = self.fetch_cached(&cache_key, &url, &params)?;

        let envelope: StoresEnvelope =
            serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let stores = envelope.data.unwrap_or_default();
        info!(locality = locality.key, stores = stores.len(), "fetched stores");
        Ok(stores)
    }

    /// Fetches the item listings for one store. Used when the stores
    /// response arrived without inlined items.
    pub fn fetch_items_for_store(
        &self,
        store_external_id: &str,
    ) -> Result<Vec<RawItem>, SourceError> {
        let cache_key = format!("items:{store_external_id}");

        let url = format!("{}/items/", self.base_url);
        let mut params = HashMap::new();
        params.insert("storeIds", store_external_id.to_string());

        let body = self.fetch_cached(&cache_key, &url, &params)?;

        let envelope: ItemsEnvelope =
            serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let items = envelope
            .data
            .and_then(|mut per_store| per_store.remove(store_external_id))
            .unwrap_or_default();
        info!(store = store_external_id, items = items.len(), "fetched items");
        Ok(items)
    }

    /// Read-through fetch: returns the cached body when fresh, otherwise
    /// performs the request, classifies failures and caches the body.
    fn fetch_cached(
        &self,
        cache_key: &str,
        url: &str,
        params: &HashMap<&str, String>,
    ) -> Result<String, SourceError> {
        if let Some(body) = self.cache.get(cache_key) {
            debug!(key = cache_key, "source cache hit");
            return Ok(body);
        }

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-CA")
            .header("flashfood-app-info", APP_INFO)
            .header("x-ff-api-key", &self.api_key)
            .query(params)
            .send()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Rejected(status.as_u16()));
        }

        let body = resp
            .text()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        self.cache.put(cache_key.to_string(), body.clone());
        Ok(body)
    }
}
