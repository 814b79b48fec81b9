use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::params;

use crate::db::connection::{apply_schema, Database};
use crate::domain::deal::{ProductRecord, StoreRecord};
use crate::domain::diff::DiffEntry;
use crate::errors::ServerError;
use crate::notify::{DealMailer, MailerError};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Initialize a fresh test DB using the production schema
pub fn make_test_db(tag: &str) -> Database {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("dealwatch_{tag}_{nanos}.sqlite"));

    let db = Database::new(path.to_string_lossy().to_string());
    apply_schema(&db, SCHEMA_SQL).expect("schema init failed");
    db
}

/// Seed a user + preferences row; returns the user id.
pub fn seed_subscriber(db: &Database, email: &str, city: &str) -> i64 {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (email, full_name) VALUES (?1, ?2)",
            params![email, "Test User"],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        let user_id = conn.last_insert_rowid();

        conn.execute(
            r#"
            INSERT INTO user_preferences (user_id, city, notification_start, notification_end)
            VALUES (?1, ?2, '00:00', '23:59')
            "#,
            params![user_id, city],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

        Ok(user_id)
    })
    .expect("seed subscriber failed")
}

pub fn store_record(external_id: &str) -> StoreRecord {
    StoreRecord {
        external_id: external_id.to_string(),
        name: format!("Store {external_id}"),
        address: Some("100 Test Ave".to_string()),
        latitude: Some(51.0),
        longitude: Some(-114.0),
    }
}

pub fn product_record(external_id: &str, price: f64, quantity: i64) -> ProductRecord {
    let original_price = price * 2.0;
    ProductRecord {
        external_id: external_id.to_string(),
        name: format!("Item {external_id}"),
        description: None,
        category: "Bakery".to_string(),
        original_price,
        discount_price: price,
        discount_percent: Some(50),
        quantity_available: quantity,
        expiry_date: None,
        image_url: None,
    }
}

/// Mailer that records every send for assertions.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, usize)>>,
}

impl DealMailer for Arc<RecordingMailer> {
    fn send_deal_alert(
        &self,
        recipient_email: &str,
        _user_name: &str,
        deals: &[&DiffEntry],
    ) -> Result<(), MailerError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient_email.to_string(), deals.len()));
        Ok(())
    }
}
