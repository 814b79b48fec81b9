use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::deal::StoreRecord;
use crate::errors::ServerError;

/// A store row as persisted. Identity is the source's external id; the
/// internal id is used for joins.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Creates the store on first sighting, otherwise overwrites its mutable
/// metadata unconditionally so the row always reflects the latest
/// observation. Stores are never deleted.
pub fn upsert_store(
    conn: &Connection,
    city: &str,
    record: &StoreRecord,
    now: NaiveDateTime,
) -> Result<StoreRow, ServerError> {
    conn.execute(
        r#"
        INSERT INTO stores (external_id, name, address, city, latitude, longitude, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        ON CONFLICT(external_id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            city = excluded.city,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            updated_at = excluded.updated_at
        "#,
        params![
            record.external_id,
            record.name,
            record.address,
            city,
            record.latitude,
            record.longitude,
            now,
        ],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;

    find_by_external_id(conn, &record.external_id)?.ok_or_else(|| {
        ServerError::DbError(format!(
            "store {} missing right after upsert",
            record.external_id
        ))
    })
}

pub fn find_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<StoreRow>, ServerError> {
    conn.query_row(
        r#"
        SELECT id, external_id, name, address, city, latitude, longitude
        FROM stores
        WHERE external_id = ?1
        "#,
        params![external_id],
        |row| {
            Ok(StoreRow {
                id: row.get(0)?,
                external_id: row.get(1)?,
                name: row.get(2)?,
                address: row.get(3)?,
                city: row.get(4)?,
                latitude: row.get(5)?,
                longitude: row.get(6)?,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(e.to_string()))
}

pub fn count_stores(conn: &Connection) -> Result<i64, ServerError> {
    conn.query_row("SELECT COUNT(*) FROM stores", [], |row| row.get(0))
        .map_err(|e| ServerError::DbError(e.to_string()))
}
