// src/config.rs

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};
use url::Url;

use crate::errors::ServerError;

/// A tracked geographic search area with fixed coordinates.
///
/// The locality list is static for the lifetime of the process; subscriber
/// preferences reference localities by `key`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locality {
    pub key: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

pub const TRACKED_LOCALITIES: &[Locality] = &[
    Locality { key: "calgary", name: "Calgary", lat: 51.0447, lon: -114.0719 },
    Locality { key: "vancouver", name: "Vancouver", lat: 49.2827, lon: -123.1207 },
    Locality { key: "toronto", name: "Toronto", lat: 43.6532, lon: -79.3832 },
    Locality { key: "edmonton", name: "Edmonton", lat: 53.5461, lon: -113.4938 },
    Locality { key: "waterloo", name: "Waterloo/Kitchener", lat: 43.4643, lon: -80.5204 },
];

/// Runtime settings, loaded once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,

    pub source_base_url: String,
    pub source_api_key: String,
    pub poll_interval_secs: u64,
    pub search_radius_meters: i64,
    pub stores_limit: i64,

    /// Resend API key; when absent the mock mailer is used.
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub email_sender_name: String,
    pub max_deals_per_email: usize,
}

impl Config {
    pub fn load() -> Result<Self, ServerError> {
        let config = Self {
            bind_addr: try_load("DEALWATCH_BIND_ADDR", "127.0.0.1:3000"),
            database_path: try_load("DEALWATCH_DB_PATH", "dealwatch.sqlite3"),
            source_base_url: try_load(
                "FLASHFOOD_BASE_URL",
                "https://app.shopper.flashfood.com/api/v1",
            ),
            source_api_key: try_load("FLASHFOOD_API_KEY", ""),
            poll_interval_secs: try_load("FLASHFOOD_POLL_INTERVAL_SECONDS", "300"),
            search_radius_meters: try_load("FLASHFOOD_SEARCH_RADIUS_METERS", "75000"),
            stores_limit: try_load("FLASHFOOD_STORES_LIMIT", "50"),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            email_from: try_load("EMAIL_FROM", "notifications@dealwatch.example"),
            email_sender_name: try_load("EMAIL_SENDER_NAME", "Dealwatch"),
            max_deals_per_email: try_load("MAX_DEALS_PER_EMAIL", "10"),
        };

        // A malformed base URL would otherwise only surface on the first
        // poll cycle.
        Url::parse(&config.source_base_url)
            .map_err(|e| ServerError::Config(format!("invalid FLASHFOOD_BASE_URL: {e}")))?;

        if config.source_api_key.is_empty() {
            warn!("FLASHFOOD_API_KEY not set; source requests will be rejected upstream");
        }
        if config.resend_api_key.is_none() {
            info!("RESEND_API_KEY not set; using mock mailer");
        }

        Ok(config)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value ({e}), using default: {default}");
        default
            .parse()
            .unwrap_or_else(|e| panic!("Default for {key} does not parse: {e}"))
    })
}
