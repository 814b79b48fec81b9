use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::domain::diff::CycleSummary;
use crate::errors::ServerError;

/// Audit row for one ingestion cycle, shown on the status page.
#[derive(Debug)]
pub struct IngestRun {
    pub id: i64,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub stores_seen: Option<i64>,
    pub new_deals: Option<i64>,
    pub changed_deals: Option<i64>,
    pub notified: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_run(conn: &Connection, now: NaiveDateTime) -> Result<i64, ServerError> {
    conn.execute(
        "INSERT INTO ingest_runs (started_at, success) VALUES (?1, 0)",
        params![now],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(
    conn: &Connection,
    run_id: i64,
    now: NaiveDateTime,
    summary: &CycleSummary,
    success: bool,
    error: Option<String>,
) -> Result<(), ServerError> {
    conn.execute(
        r#"
        UPDATE ingest_runs SET
            finished_at = ?1,
            stores_seen = ?2,
            new_deals = ?3,
            changed_deals = ?4,
            notified = ?5,
            success = ?6,
            error_message = ?7
        WHERE id = ?8
        "#,
        params![
            now,
            summary.stores_seen as i64,
            summary.new_deals as i64,
            summary.changed_deals as i64,
            summary.notified as i64,
            success,
            error,
            run_id,
        ],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(())
}

pub fn recent_runs(conn: &Connection, limit: i64) -> Result<Vec<IngestRun>, ServerError> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, started_at, finished_at, stores_seen, new_deals,
                   changed_deals, notified, success, error_message
            FROM ingest_runs
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(IngestRun {
                id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                stores_seen: row.get(3)?,
                new_deals: row.get(4)?,
                changed_deals: row.get(5)?,
                notified: row.get(6)?,
                success: row.get(7)?,
                error_message: row.get(8)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(runs)
}
