// src/scheduler.rs
//
// Drives the ingestion pipeline: every poll interval (and on demand via
// run_once) it fetches each tracked locality, reconciles every returned
// store, then hands the combined diff to the dispatcher and broadcaster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::broadcast::{Broadcaster, DealEvent};
use crate::config::{Locality, TRACKED_LOCALITIES};
use crate::db::connection::Database;
use crate::db::{cycles, subscribers};
use crate::domain::deal::{ProductRecord, StoreRecord};
use crate::domain::diff::{CycleSummary, DiffEntry};
use crate::notify::NotificationDispatcher;
use crate::reconcile::reconcile_store;
use crate::source::{FlashfoodClient, RawItem, SourceError};

/// Owns the polling lifecycle: `Stopped -> Running -> Stopped`. Cheap to
/// clone; all clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    db: Database,
    client: FlashfoodClient,
    dispatcher: NotificationDispatcher,
    broadcaster: Arc<Broadcaster>,
    poll_interval: Duration,
    running: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
}

impl Scheduler {
    pub fn new(
        db: Database,
        client: FlashfoodClient,
        dispatcher: NotificationDispatcher,
        broadcaster: Arc<Broadcaster>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                db,
                client,
                dispatcher,
                broadcaster,
                poll_interval,
                running: AtomicBool::new(false),
                stop_tx: Mutex::new(None),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Begins polling on the configured interval. Calling this while
    /// already running is a logged no-op.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("scheduler is already running");
            return;
        }

        let (tx, rx) = mpsc::channel();
        *self.inner.stop_tx.lock().unwrap() = Some(tx);

        let inner = self.inner.clone();
        thread::spawn(move || {
            info!(
                interval_secs = inner.poll_interval.as_secs(),
                "scheduler started"
            );
            loop {
                match rx.recv_timeout(inner.poll_interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        inner.run_cycle();
                    }
                    // Stop signal, or the handle went away entirely.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("scheduler stopped");
        });
    }

    /// Prevents future ticks. An in-flight cycle runs to completion; while
    /// stopped this is a no-op.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.inner.stop_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }

    /// Runs one full cycle on the caller's thread, outside the schedule.
    /// May overlap a scheduled tick; reconciliation is idempotent per
    /// store and later writes win.
    pub fn run_once(&self) -> CycleSummary {
        self.inner.run_cycle()
    }
}

impl SchedulerInner {
    fn run_cycle(&self) -> CycleSummary {
        info!("starting deal refresh cycle");
        let started_at = Utc::now().naive_utc();

        let run_id = self
            .db
            .with_conn(|conn| cycles::start_run(conn, started_at))
            .unwrap_or_else(|e| {
                warn!("could not open ingest_runs row: {e}");
                0
            });

        let mut summary = CycleSummary::default();
        let mut diff: Vec<DiffEntry> = Vec::new();

        for locality in TRACKED_LOCALITIES {
            info!(locality = locality.name, "fetching deals");
            match self.refresh_locality(locality) {
                Ok((mut entries, stores_seen)) => {
                    summary.stores_seen += stores_seen;
                    diff.append(&mut entries);
                }
                Err(e) => {
                    error!(locality = locality.name, "error fetching deals: {e}");
                    summary.localities_failed += 1;
                }
            }
        }

        summary.new_deals = diff.iter().filter(|e| e.is_new()).count();
        summary.changed_deals = diff.len() - summary.new_deals;
        info!(
            new_deals = summary.new_deals,
            changed_deals = summary.changed_deals,
            stores = summary.stores_seen,
            "deal refresh complete"
        );

        if summary.new_deals > 0 {
            match self.db.with_conn(|conn| subscribers::load_subscribers(conn)) {
                Ok(subs) => summary.notified = self.dispatcher.dispatch(&diff, &subs),
                Err(e) => error!("could not load subscribers: {e}"),
            }

            self.broadcaster
                .broadcast(&DealEvent::new_deals(summary.new_deals));
        }

        if run_id > 0 {
            let success = summary.localities_failed == 0;
            let error = (!success)
                .then(|| format!("{} localities failed to fetch", summary.localities_failed));
            if let Err(e) = self.db.with_conn(|conn| {
                cycles::finish_run(conn, run_id, Utc::now().naive_utc(), &summary, success, error)
            }) {
                warn!("could not close ingest_runs row: {e}");
            }
        }

        summary
    }

    /// Fetches and reconciles one locality. A store that fails to persist
    /// is logged and skipped; only a fetch failure skips the locality.
    fn refresh_locality(
        &self,
        locality: &Locality,
    ) -> Result<(Vec<DiffEntry>, usize), SourceError> {
        let raw_stores = self.client.fetch_stores_near(locality)?;

        let mut diff = Vec::new();
        let mut stores_seen = 0;

        for raw_store in &raw_stores {
            let store = match StoreRecord::from_raw(raw_store) {
                Ok(s) => s,
                Err(e) => {
                    warn!(locality = locality.key, "skipping store: {e}");
                    continue;
                }
            };

            // Items usually arrive inlined; fall back to a per-store fetch
            // when they don't.
            let fetched;
            let raw_items: &[RawItem] = match &raw_store.items {
                Some(items) => items,
                None => match self.client.fetch_items_for_store(&store.external_id) {
                    Ok(items) => {
                        fetched = items;
                        &fetched
                    }
                    Err(e) => {
                        error!(store = %store.external_id, "could not fetch items: {e}");
                        continue;
                    }
                },
            };

            let items: Vec<ProductRecord> = raw_items
                .iter()
                .filter_map(|raw| match ProductRecord::from_raw(raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(store = %store.external_id, "skipping item: {e}");
                        None
                    }
                })
                .collect();

            match reconcile_store(&self.db, locality.key, &store, &items) {
                Ok(mut entries) => {
                    stores_seen += 1;
                    diff.append(&mut entries);
                }
                Err(e) => {
                    error!(store = %store.external_id, "reconciliation failed: {e}");
                }
            }
        }

        Ok((diff, stores_seen))
    }
}
