use chrono::NaiveTime;
use rusqlite::Connection;
use tracing::warn;

use crate::domain::subscriber::Subscriber;
use crate::errors::ServerError;

/// Loads every user joined with their preferences. The dispatcher applies
/// all filtering; this is a plain read.
pub fn load_subscribers(conn: &Connection) -> Result<Vec<Subscriber>, ServerError> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                u.id,                   -- 0
                u.email,                -- 1
                u.full_name,            -- 2
                p.city,                 -- 3
                p.selected_store_ids,   -- 4 (JSON array or NULL)
                p.favorite_categories,  -- 5 (JSON array or NULL)
                p.min_discount_percent, -- 6
                p.email_notifications,  -- 7
                p.notify_new_deals,     -- 8
                p.notification_start,   -- 9 (HH:MM)
                p.notification_end      -- 10
            FROM users u
            JOIN user_preferences p ON p.user_id = u.id
            "#,
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            let email: String = row.get(1)?;
            Ok(Subscriber {
                user_id: row.get(0)?,
                full_name: row.get(2)?,
                city: row.get(3)?,
                selected_store_ids: decode_json_ids(row.get::<_, Option<String>>(4)?, &email),
                favorite_categories: decode_json_strings(row.get::<_, Option<String>>(5)?, &email),
                min_discount_percent: row.get(6)?,
                email_notifications: row.get(7)?,
                notify_new_deals: row.get(8)?,
                notification_start: parse_window_time(
                    &row.get::<_, String>(9)?,
                    &email,
                    NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                ),
                notification_end: parse_window_time(
                    &row.get::<_, String>(10)?,
                    &email,
                    NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                ),
                email,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut subscribers = Vec::new();
    for row in rows {
        subscribers.push(row.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(subscribers)
}

fn decode_json_ids(raw: Option<String>, email: &str) -> Vec<i64> {
    let Some(raw) = raw else { return Vec::new() };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(subscriber = email, "unreadable selected_store_ids ({e}); treating as unset");
        Vec::new()
    })
}

fn decode_json_strings(raw: Option<String>, email: &str) -> Vec<String> {
    let Some(raw) = raw else { return Vec::new() };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(subscriber = email, "unreadable favorite_categories ({e}); treating as unset");
        Vec::new()
    })
}

/// Window times are stored as `HH:MM`; older rows may carry seconds. An
/// unreadable value falls back to the window edge rather than silencing
/// the subscriber.
fn parse_window_time(raw: &str, email: &str, fallback: NaiveTime) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .unwrap_or_else(|e| {
            warn!(subscriber = email, "unreadable window time {raw:?} ({e}); defaulting");
            fallback
        })
}
