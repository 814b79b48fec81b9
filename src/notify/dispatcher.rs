// src/notify/dispatcher.rs

use chrono::{NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::diff::DiffEntry;
use crate::domain::subscriber::Subscriber;
use crate::notify::mailer::DealMailer;

/// Fans a cycle's diff out to subscribers: at most one email per
/// subscriber per cycle, carrying all of their matching new deals.
pub struct NotificationDispatcher {
    mailer: Box<dyn DealMailer>,
    max_deals_per_email: usize,
}

impl NotificationDispatcher {
    pub fn new(mailer: Box<dyn DealMailer>, max_deals_per_email: usize) -> Self {
        Self {
            mailer,
            max_deals_per_email,
        }
    }

    /// Returns the number of notifications actually delivered. A failed
    /// send is logged and counted as a non-success; it never blocks the
    /// remaining subscribers.
    pub fn dispatch(&self, diff: &[DiffEntry], subscribers: &[Subscriber]) -> usize {
        self.dispatch_at(diff, subscribers, Utc::now().time())
    }

    /// Clock-injected variant of [`dispatch`](Self::dispatch); `now` is the
    /// UTC time of day checked against each subscriber's window.
    pub fn dispatch_at(
        &self,
        diff: &[DiffEntry],
        subscribers: &[Subscriber],
        now: NaiveTime,
    ) -> usize {
        // Only newly appeared deals are notifiable; price/quantity changes
        // feed history, not inboxes.
        let new_deals: Vec<&DiffEntry> = diff.iter().filter(|e| e.is_new()).collect();
        if new_deals.is_empty() {
            return 0;
        }

        info!(deals = new_deals.len(), "processing new deals for notifications");

        let mut sent = 0;
        for subscriber in subscribers {
            if !subscriber.email_notifications || !subscriber.notify_new_deals {
                continue;
            }

            if !subscriber.window_allows(now) {
                debug!(subscriber = %subscriber.email, "outside notification window");
                continue;
            }

            let mut matching: Vec<&DiffEntry> = new_deals
                .iter()
                .copied()
                .filter(|entry| deal_matches(subscriber, entry))
                .collect();

            if matching.is_empty() {
                debug!(subscriber = %subscriber.email, "no matching deals");
                continue;
            }

            // Keep the payload bounded; the freshest deals are all equally
            // new, so the first N of the cycle are as good as any.
            matching.truncate(self.max_deals_per_email);

            match self
                .mailer
                .send_deal_alert(&subscriber.email, subscriber.display_name(), &matching)
            {
                Ok(()) => {
                    info!(
                        subscriber = %subscriber.email,
                        deals = matching.len(),
                        "sent deal notification"
                    );
                    sent += 1;
                }
                Err(e) => {
                    warn!(subscriber = %subscriber.email, "failed to send notification: {e}");
                }
            }
        }

        info!(sent, "deal notifications sent");
        sent
    }
}

/// Per-deal filter, evaluated in order; any failing check excludes the
/// deal for this subscriber.
fn deal_matches(subscriber: &Subscriber, entry: &DiffEntry) -> bool {
    if entry.store.city != subscriber.city {
        return false;
    }

    if !subscriber.selected_store_ids.is_empty()
        && !subscriber.selected_store_ids.contains(&entry.store.id)
    {
        return false;
    }

    match entry.deal.discount_percent {
        Some(percent) => {
            if percent < subscriber.min_discount_percent {
                return false;
            }
        }
        // A deal with no computable discount can't clear a nonzero bar.
        None => {
            if subscriber.min_discount_percent > 0 {
                return false;
            }
        }
    }

    if !subscriber.favorite_categories.is_empty() {
        match &entry.deal.category {
            Some(category) if subscriber.favorite_categories.contains(category) => {}
            _ => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diff::{DealSnapshot, DiffKind, StoreContext};
    use crate::notify::mailer::MailerError;
    use std::sync::{Arc, Mutex};

    /// Records every send; optionally fails for one recipient.
    struct RecordingMailer {
        sent: Mutex<Vec<(String, usize)>>,
        fail_for: Option<String>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: None,
            }
        }
    }

    impl DealMailer for Arc<RecordingMailer> {
        fn send_deal_alert(
            &self,
            recipient_email: &str,
            _user_name: &str,
            deals: &[&DiffEntry],
        ) -> Result<(), MailerError> {
            if self.fail_for.as_deref() == Some(recipient_email) {
                return Err(MailerError::ApiError("simulated".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient_email.to_string(), deals.len()));
            Ok(())
        }
    }

    fn new_deal(store_id: i64, city: &str, category: &str, discount: Option<i64>) -> DiffEntry {
        DiffEntry {
            kind: DiffKind::New,
            store: StoreContext {
                id: store_id,
                external_id: format!("store-{store_id}"),
                name: "Test Store".into(),
                city: city.into(),
            },
            deal: DealSnapshot {
                product_id: 1,
                external_id: "item".into(),
                name: "Test Deal".into(),
                description: None,
                category: Some(category.into()),
                original_price: 10.0,
                discount_price: 5.0,
                discount_percent: discount,
                quantity_available: 2,
                expiry_date: None,
            },
        }
    }

    fn subscriber(email: &str, city: &str) -> Subscriber {
        Subscriber {
            user_id: 1,
            email: email.into(),
            full_name: None,
            city: city.into(),
            selected_store_ids: vec![],
            favorite_categories: vec![],
            min_discount_percent: 0,
            email_notifications: true,
            notify_new_deals: true,
            notification_start: "00:00:00".parse().unwrap(),
            notification_end: "23:59:59".parse().unwrap(),
        }
    }

    fn noon() -> NaiveTime {
        "12:00:00".parse().unwrap()
    }

    fn dispatcher_with(
        mailer: RecordingMailer,
    ) -> (NotificationDispatcher, Arc<RecordingMailer>) {
        let mailer = Arc::new(mailer);
        let dispatcher = NotificationDispatcher::new(Box::new(mailer.clone()), 10);
        (dispatcher, mailer)
    }

    #[test]
    fn discount_threshold_filters_deals() {
        let (dispatcher, mailer) = dispatcher_with(RecordingMailer::new());
        let mut sub = subscriber("a@example.com", "calgary");
        sub.min_discount_percent = 20;

        let below = [new_deal(1, "calgary", "Bakery", Some(15))];
        assert_eq!(dispatcher.dispatch_at(&below, &[sub.clone()], noon()), 0);

        let above = [new_deal(1, "calgary", "Bakery", Some(25))];
        assert_eq!(dispatcher.dispatch_at(&above, &[sub], noon()), 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("a@example.com".to_string(), 1)]);
    }

    #[test]
    fn absent_discount_fails_a_nonzero_threshold_only() {
        let (dispatcher, _) = dispatcher_with(RecordingMailer::new());
        let deals = [new_deal(1, "calgary", "Bakery", None)];

        let mut strict = subscriber("strict@example.com", "calgary");
        strict.min_discount_percent = 20;
        assert_eq!(dispatcher.dispatch_at(&deals, &[strict], noon()), 0);

        let lax = subscriber("lax@example.com", "calgary");
        assert_eq!(dispatcher.dispatch_at(&deals, &[lax], noon()), 1);
    }

    #[test]
    fn city_and_store_and_category_filters() {
        let (dispatcher, _) = dispatcher_with(RecordingMailer::new());
        let deals = [new_deal(7, "calgary", "Dairy", Some(50))];

        let wrong_city = subscriber("van@example.com", "vancouver");
        assert_eq!(dispatcher.dispatch_at(&deals, &[wrong_city], noon()), 0);

        let mut other_store = subscriber("store@example.com", "calgary");
        other_store.selected_store_ids = vec![1, 2];
        assert_eq!(dispatcher.dispatch_at(&deals, &[other_store], noon()), 0);

        let mut this_store = subscriber("store2@example.com", "calgary");
        this_store.selected_store_ids = vec![7];
        assert_eq!(dispatcher.dispatch_at(&deals, &[this_store], noon()), 1);

        let mut wrong_category = subscriber("cat@example.com", "calgary");
        wrong_category.favorite_categories = vec!["Meat".into()];
        assert_eq!(dispatcher.dispatch_at(&deals, &[wrong_category], noon()), 0);
    }

    #[test]
    fn disabled_subscribers_are_skipped_entirely() {
        let (dispatcher, _) = dispatcher_with(RecordingMailer::new());
        let deals = [new_deal(1, "calgary", "Bakery", Some(50))];

        let mut muted = subscriber("muted@example.com", "calgary");
        muted.notify_new_deals = false;
        let mut no_email = subscriber("noemail@example.com", "calgary");
        no_email.email_notifications = false;

        assert_eq!(dispatcher.dispatch_at(&deals, &[muted, no_email], noon()), 0);
    }

    #[test]
    fn outside_window_is_skipped() {
        let (dispatcher, _) = dispatcher_with(RecordingMailer::new());
        let deals = [new_deal(1, "calgary", "Bakery", Some(50))];

        let mut night_owl = subscriber("owl@example.com", "calgary");
        night_owl.notification_start = "22:00:00".parse().unwrap();
        night_owl.notification_end = "05:00:00".parse().unwrap();

        assert_eq!(dispatcher.dispatch_at(&deals, &[night_owl.clone()], noon()), 0);
        let late: NaiveTime = "23:30:00".parse().unwrap();
        assert_eq!(dispatcher.dispatch_at(&deals, &[night_owl], late), 1);
    }

    #[test]
    fn one_email_per_subscriber_with_bounded_batch() {
        let (dispatcher, mailer) = dispatcher_with(RecordingMailer::new());

        let deals: Vec<DiffEntry> = (0..25)
            .map(|_| new_deal(1, "calgary", "Bakery", Some(50)))
            .collect();
        let sub = subscriber("batch@example.com", "calgary");

        assert_eq!(dispatcher.dispatch_at(&deals, &[sub], noon()), 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, 10); // capped
    }

    #[test]
    fn changed_entries_are_not_dispatched() {
        let (dispatcher, _) = dispatcher_with(RecordingMailer::new());

        let mut entry = new_deal(1, "calgary", "Bakery", Some(50));
        entry.kind = DiffKind::Changed {
            old_price: 5.0,
            new_price: 4.0,
            old_quantity: 2,
            new_quantity: 2,
        };

        let sub = subscriber("change@example.com", "calgary");
        assert_eq!(dispatcher.dispatch_at(&[entry], &[sub], noon()), 0);
    }

    #[test]
    fn a_failing_send_does_not_block_other_subscribers() {
        let mut mailer = RecordingMailer::new();
        mailer.fail_for = Some("broken@example.com".into());
        let (dispatcher, peek) = dispatcher_with(mailer);

        let deals = [new_deal(1, "calgary", "Bakery", Some(50))];
        let subs = [
            subscriber("broken@example.com", "calgary"),
            subscriber("fine@example.com", "calgary"),
        ];

        assert_eq!(dispatcher.dispatch_at(&deals, &subs, noon()), 1);
        let sent = peek.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("fine@example.com".to_string(), 1)]);
    }
}
