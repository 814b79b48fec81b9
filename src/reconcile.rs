// src/reconcile.rs
//
// Merges one store's observed snapshot against persisted state: upserts the
// store, creates or updates each listing, appends price history on change
// and soft-deletes listings that vanished. The produced diff entries exist
// only for the current cycle.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::db::connection::Database;
use crate::db::{products, stores};
use crate::domain::deal::{ProductRecord, StoreRecord};
use crate::domain::diff::{DealSnapshot, DiffEntry, DiffKind, StoreContext};
use crate::errors::ServerError;

/// Reconciles one store's snapshot inside its own transaction, so a failure
/// here can never corrupt another store's state. A failing item is logged
/// and skipped; the rest of the snapshot still lands.
pub fn reconcile_store(
    db: &Database,
    city: &str,
    store: &StoreRecord,
    items: &[ProductRecord],
) -> Result<Vec<DiffEntry>, ServerError> {
    db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let now = Utc::now().naive_utc();

        // Store metadata always reflects the latest observation.
        let store_row = stores::upsert_store(&tx, city, store, now)?;
        let store_ctx = StoreContext {
            id: store_row.id,
            external_id: store_row.external_id,
            name: store_row.name,
            city: store_row.city,
        };

        let mut diff = Vec::new();
        let mut seen_external_ids = HashSet::new();

        // Items are applied in snapshot order; for conflicting fields the
        // last observation wins.
        for item in items {
            seen_external_ids.insert(item.external_id.clone());

            match reconcile_item(&tx, &store_ctx, item, now) {
                Ok(Some(entry)) => diff.push(entry),
                Ok(None) => {}
                Err(e) => {
                    error!(
                        store = %store_ctx.external_id,
                        item = %item.external_id,
                        "failed to process item: {e}"
                    );
                }
            }
        }

        // Soft-delete pass: anything still marked available but absent from
        // this snapshot is gone. Not a notifiable event.
        let stale = products::mark_stale_except(&tx, store_ctx.id, &seen_external_ids, now)?;
        if stale > 0 {
            debug!(store = %store_ctx.external_id, count = stale, "marked stale products out of stock");
        }

        tx.commit().map_err(|e| ServerError::DbError(e.to_string()))?;

        Ok(diff)
    })
}

/// Creates or updates a single listing and decides whether it is worth a
/// diff entry. Only discount price and quantity movements count as a
/// change; other fields drift silently.
fn reconcile_item(
    conn: &Connection,
    store: &StoreContext,
    item: &ProductRecord,
    now: chrono::NaiveDateTime,
) -> Result<Option<DiffEntry>, ServerError> {
    match products::find_by_external_id(conn, store.id, &item.external_id)? {
        None => {
            let product_id = products::insert_product(conn, store.id, item, now)?;
            products::append_price_history(
                conn,
                product_id,
                item.discount_price,
                item.quantity_available,
                now,
            )?;

            info!(
                deal = %item.name,
                store = %store.name,
                price = item.discount_price,
                "new deal"
            );

            Ok(Some(DiffEntry {
                kind: DiffKind::New,
                store: store.clone(),
                deal: snapshot(product_id, item),
            }))
        }
        Some(existing) => {
            let price_changed = existing.discount_price != item.discount_price;
            let quantity_changed = existing.quantity_available != item.quantity_available;

            // Overwrite mutable fields and advance last_seen even when
            // nothing notifiable moved.
            products::update_observed(conn, existing.id, item, now)?;

            if price_changed || quantity_changed {
                products::append_price_history(
                    conn,
                    existing.id,
                    item.discount_price,
                    item.quantity_available,
                    now,
                )?;

                Ok(Some(DiffEntry {
                    kind: DiffKind::Changed {
                        old_price: existing.discount_price,
                        new_price: item.discount_price,
                        old_quantity: existing.quantity_available,
                        new_quantity: item.quantity_available,
                    },
                    store: store.clone(),
                    deal: snapshot(existing.id, item),
                }))
            } else {
                Ok(None)
            }
        }
    }
}

fn snapshot(product_id: i64, item: &ProductRecord) -> DealSnapshot {
    DealSnapshot {
        product_id,
        external_id: item.external_id.clone(),
        name: item.name.clone(),
        description: item.description.clone(),
        category: Some(item.category.clone()),
        original_price: item.original_price,
        discount_price: item.discount_price,
        discount_percent: item.discount_percent,
        quantity_available: item.quantity_available,
        expiry_date: item.expiry_date,
    }
}
