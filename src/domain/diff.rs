// src/domain/diff.rs

use chrono::NaiveDateTime;
use serde::Serialize;

/// How a listing changed relative to stored state. Only price and quantity
/// movements produce a `Changed` entry; other field drift updates silently.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffKind {
    New,
    Changed {
        old_price: f64,
        new_price: f64,
        old_quantity: i64,
        new_quantity: i64,
    },
}

/// Store context carried alongside each diff entry so the dispatcher can
/// filter without further lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreContext {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub city: String,
}

/// The deal as it stands after this cycle's write.
#[derive(Debug, Clone, PartialEq)]
pub struct DealSnapshot {
    pub product_id: i64,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub original_price: f64,
    pub discount_price: f64,
    pub discount_percent: Option<i64>,
    pub quantity_available: i64,
    pub expiry_date: Option<NaiveDateTime>,
}

/// A single new-or-changed listing, scoped to one cycle. Never persisted;
/// this is the hand-off from reconciliation to notification.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub store: StoreContext,
    pub deal: DealSnapshot,
}

impl DiffEntry {
    pub fn is_new(&self) -> bool {
        matches!(self.kind, DiffKind::New)
    }
}

/// Aggregate counts for one full ingestion cycle, returned by the manual
/// trigger and written to `ingest_runs`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleSummary {
    pub stores_seen: usize,
    pub new_deals: usize,
    pub changed_deals: usize,
    pub notified: usize,
    pub localities_failed: usize,
}
