use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Short-TTL cache of raw response bodies, shared across fetches.
///
/// Purely a cost optimization: a manual refresh fired right after a
/// scheduled tick reuses the previous responses instead of hitting the
/// upstream API again. Correctness never depends on a hit.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored_at, body)) if stored_at.elapsed() < self.ttl => Some(body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, body: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (Instant::now(), body));
        }
    }
}
