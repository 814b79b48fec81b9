// src/domain/subscriber.rs

use chrono::NaiveTime;

/// A user and their notification preferences, joined into one read model.
/// Preference management lives outside the ingestion pipeline; this is
/// read-only input to the dispatcher.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub city: String,
    /// Internal store ids; empty means "any store in my city".
    pub selected_store_ids: Vec<i64>,
    /// Empty means "any category".
    pub favorite_categories: Vec<String>,
    pub min_discount_percent: i64,
    pub email_notifications: bool,
    pub notify_new_deals: bool,
    pub notification_start: NaiveTime,
    pub notification_end: NaiveTime,
}

impl Subscriber {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    /// Whether `now` (UTC time of day) falls inside the notification
    /// window. A window with `start > end` wraps past midnight.
    pub fn window_allows(&self, now: NaiveTime) -> bool {
        let (start, end) = (self.notification_start, self.notification_end);
        if start <= end {
            start <= now && now <= end
        } else {
            now >= start || now <= end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber_with_window(start: &str, end: &str) -> Subscriber {
        Subscriber {
            user_id: 1,
            email: "a@example.com".into(),
            full_name: None,
            city: "calgary".into(),
            selected_store_ids: vec![],
            favorite_categories: vec![],
            min_discount_percent: 0,
            email_notifications: true,
            notify_new_deals: true,
            notification_start: start.parse().unwrap(),
            notification_end: end.parse().unwrap(),
        }
    }

    fn at(hhmm: &str) -> NaiveTime {
        hhmm.parse().unwrap()
    }

    #[test]
    fn plain_window() {
        let sub = subscriber_with_window("09:00:00", "17:00:00");
        assert!(sub.window_allows(at("09:00:00")));
        assert!(sub.window_allows(at("12:30:00")));
        assert!(sub.window_allows(at("17:00:00")));
        assert!(!sub.window_allows(at("08:59:00")));
        assert!(!sub.window_allows(at("20:00:00")));
    }

    #[test]
    fn window_wrapping_midnight() {
        let sub = subscriber_with_window("22:00:00", "05:00:00");
        assert!(sub.window_allows(at("23:30:00")));
        assert!(sub.window_allows(at("03:00:00")));
        assert!(sub.window_allows(at("22:00:00")));
        assert!(sub.window_allows(at("05:00:00")));
        assert!(!sub.window_allows(at("12:00:00")));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut sub = subscriber_with_window("00:00:00", "23:59:00");
        assert_eq!(sub.display_name(), "a@example.com");
        sub.full_name = Some("Alex".into());
        assert_eq!(sub.display_name(), "Alex");
    }
}
