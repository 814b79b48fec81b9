// src/broadcast.rs
//
// Best-effort live updates: connected clients get a small JSON event after
// any cycle that found new deals. No queuing for offline clients, no
// persistence, no per-user targeting.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

/// The event pushed to every connected client.
#[derive(Debug, Clone, Serialize)]
pub struct DealEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: usize,
    pub message: String,
    pub timestamp: String,
}

impl DealEvent {
    pub fn new_deals(count: usize) -> Self {
        Self {
            event_type: "new_deals".to_string(),
            count,
            message: format!("{count} new deals available!"),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// A connected client's end of the stream. Dropping it (or the transport
/// behind it) makes the next broadcast remove the membership silently.
pub struct StreamClient {
    pub id: u64,
    pub events: Receiver<String>,
}

struct Member {
    id: u64,
    sender: Sender<String>,
}

/// Membership set plus fan-out. The concrete wire transport lives outside
/// the pipeline; a member is just a channel handle.
pub struct Broadcaster {
    members: Mutex<Vec<Member>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn connect(&self) -> StreamClient {
        let id: u64 = rand::thread_rng().gen();
        let (sender, events) = mpsc::channel();

        let mut members = self.members.lock().unwrap();
        members.push(Member { id, sender });
        info!(total = members.len(), "stream client connected");

        StreamClient { id, events }
    }

    pub fn disconnect(&self, id: u64) {
        let mut members = self.members.lock().unwrap();
        members.retain(|m| m.id != id);
        info!(total = members.len(), "stream client disconnected");
    }

    pub fn connected(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    /// Serializes the event once and sends it to every member. A failed
    /// send drops that member from the set; it never raises to the caller.
    pub fn broadcast(&self, event: &DealEvent) {
        let Ok(json) = serde_json::to_string(event) else {
            return;
        };

        let mut members = self.members.lock().unwrap();
        if members.is_empty() {
            return;
        }

        let before = members.len();
        members.retain(|m| m.sender.send(json.clone()).is_ok());

        let dropped = before - members.len();
        if dropped > 0 {
            debug!(dropped, "removed dead stream clients during broadcast");
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
