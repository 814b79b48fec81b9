use std::collections::HashSet;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::deal::ProductRecord;
use crate::errors::ServerError;

/// A deal listing row. `(store_id, external_id)` identifies the listing
/// across its whole observed lifetime; price and quantity mutate in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub id: i64,
    pub store_id: i64,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub original_price: f64,
    pub discount_price: f64,
    pub discount_percent: Option<i64>,
    pub quantity_available: i64,
    pub expiry_date: Option<NaiveDateTime>,
    pub image_url: Option<String>,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
}

const PRODUCT_COLUMNS: &str = r#"
    id, store_id, external_id, name, description, category,
    original_price, discount_price, discount_percent,
    quantity_available, expiry_date, image_url, first_seen, last_seen
"#;

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        store_id: row.get(1)?,
        external_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        original_price: row.get(6)?,
        discount_price: row.get(7)?,
        discount_percent: row.get(8)?,
        quantity_available: row.get(9)?,
        expiry_date: row.get(10)?,
        image_url: row.get(11)?,
        first_seen: row.get(12)?,
        last_seen: row.get(13)?,
    })
}

pub fn find_by_external_id(
    conn: &Connection,
    store_id: i64,
    external_id: &str,
) -> Result<Option<ProductRow>, ServerError> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE store_id = ?1 AND external_id = ?2"),
        params![store_id, external_id],
        row_to_product,
    )
    .optional()
    .map_err(|e| ServerError::DbError(e.to_string()))
}

/// Inserts a newly observed listing with `first_seen = last_seen = now`.
pub fn insert_product(
    conn: &Connection,
    store_id: i64,
    record: &ProductRecord,
    now: NaiveDateTime,
) -> Result<i64, ServerError> {
    conn.execute(
        r#"
        INSERT INTO products (
            store_id, external_id, name, description, category,
            original_price, discount_price, discount_percent,
            quantity_available, expiry_date, image_url, first_seen, last_seen
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        "#,
        params![
            store_id,
            record.external_id,
            record.name,
            record.description,
            record.category,
            record.original_price,
            record.discount_price,
            record.discount_percent,
            record.quantity_available,
            record.expiry_date,
            record.image_url,
            now,
        ],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;

    Ok(conn.last_insert_rowid())
}

/// Overwrites all mutable fields with the fresh observation and advances
/// `last_seen`, whether or not price/quantity moved. Name, description,
/// category and expiry drift this way without producing history.
pub fn update_observed(
    conn: &Connection,
    product_id: i64,
    record: &ProductRecord,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    conn.execute(
        r#"
        UPDATE products SET
            name = ?1,
            description = ?2,
            category = ?3,
            original_price = ?4,
            discount_price = ?5,
            discount_percent = ?6,
            quantity_available = ?7,
            expiry_date = ?8,
            image_url = ?9,
            last_seen = ?10
        WHERE id = ?11
        "#,
        params![
            record.name,
            record.description,
            record.category,
            record.original_price,
            record.discount_price,
            record.discount_percent,
            record.quantity_available,
            record.expiry_date,
            record.image_url,
            now,
            product_id,
        ],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;

    Ok(())
}

/// Appends one immutable price-history observation.
pub fn append_price_history(
    conn: &Connection,
    product_id: i64,
    price: f64,
    quantity_available: i64,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    conn.execute(
        r#"
        INSERT INTO price_history (product_id, price, quantity_available, recorded_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![product_id, price, quantity_available, now],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;

    Ok(())
}

/// Soft-delete pass: every still-available listing of this store that was
/// absent from the snapshot gets its quantity forced to zero. Rows and
/// their history are never deleted. Returns how many went stale.
pub fn mark_stale_except(
    conn: &Connection,
    store_id: i64,
    seen_external_ids: &HashSet<String>,
    now: NaiveDateTime,
) -> Result<usize, ServerError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, external_id FROM products WHERE store_id = ?1 AND quantity_available > 0",
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![store_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut stale_ids = Vec::new();
    for row in rows {
        let (id, external_id) = row.map_err(|e| ServerError::DbError(e.to_string()))?;
        if !seen_external_ids.contains(&external_id) {
            stale_ids.push(id);
        }
    }

    for id in &stale_ids {
        conn.execute(
            "UPDATE products SET quantity_available = 0, last_seen = ?1 WHERE id = ?2",
            params![now, id],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    }

    Ok(stale_ids.len())
}

pub fn count_available(conn: &Connection) -> Result<i64, ServerError> {
    conn.query_row(
        "SELECT COUNT(*) FROM products WHERE quantity_available > 0",
        [],
        |row| row.get(0),
    )
    .map_err(|e| ServerError::DbError(e.to_string()))
}

pub fn history_points(conn: &Connection, product_id: i64) -> Result<i64, ServerError> {
    conn.query_row(
        "SELECT COUNT(*) FROM price_history WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )
    .map_err(|e| ServerError::DbError(e.to_string()))
}
