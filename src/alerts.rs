// src/alerts.rs
//! Notification feed kept in the local store and reconciled with whatever the
//! backend (or local rule evaluation) reports on each poll.

use crate::db::{LocalStore, ALERT_RULES_KEY, NOTIFICATIONS_KEY, NOTIFICATIONS_SEEN_KEY};
use crate::error::{ClientError, Result};
use crate::models::{normalize_symbol, Alert, AlertRule, Stock};
use chrono::Utc;
use log::{debug, info};
use std::collections::VecDeque;

/// How many dedup keys of evicted notifications are remembered.
const FORGOTTEN_LIMIT: usize = 512;

/// Bounded, newest-first list of notifications.
///
/// Items are unique by id and by non-empty message. `is_read` never goes
/// from `true` back to `false`. Evicted items are remembered by key so a
/// server resend cannot bring them back as unread.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFeed {
    items: Vec<Alert>,
    cap: usize,
    forgotten: VecDeque<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub added: usize,
    pub evicted: usize,
    pub unread: usize,
}

impl NotificationFeed {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
            forgotten: VecDeque::new(),
        }
    }

    pub fn load(store: &LocalStore, cap: usize) -> Self {
        let mut feed = Self {
            items: store.get_or_default(NOTIFICATIONS_KEY),
            cap,
            forgotten: store.get_or_default(NOTIFICATIONS_SEEN_KEY),
        };
        feed.evict_overflow();
        feed
    }

    pub fn save(&self, store: &mut LocalStore) -> Result<()> {
        store.set(NOTIFICATIONS_KEY, &self.items)?;
        store.set(NOTIFICATIONS_SEEN_KEY, &self.forgotten)
    }

    pub fn items(&self) -> &[Alert] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|a| !a.is_read).count()
    }

    fn position_of(&self, candidate: &Alert) -> Option<usize> {
        self.items.iter().position(|a| same_notification(a, candidate))
    }

    fn was_evicted(&self, candidate: &Alert) -> bool {
        dedup_keys(candidate).any(|key| self.forgotten.contains(&key))
    }

    /// Drops items past the cap and remembers their keys. Returns how many
    /// were dropped.
    fn evict_overflow(&mut self) -> usize {
        if self.items.len() <= self.cap {
            return 0;
        }
        let dropped: Vec<Alert> = self.items.drain(self.cap..).collect();
        for alert in &dropped {
            for key in dedup_keys(alert) {
                if !self.forgotten.contains(&key) {
                    self.forgotten.push_back(key);
                }
            }
        }
        while self.forgotten.len() > FORGOTTEN_LIMIT {
            self.forgotten.pop_front();
        }
        dropped.len()
    }

    /// Folds a freshly fetched batch into the feed.
    ///
    /// Known items keep their local read flag (a read the server reports is
    /// also honoured). Unseen items are prepended in batch order and the
    /// oldest items beyond the cap are dropped for good.
    pub fn merge(&mut self, incoming: Vec<Alert>) -> MergeOutcome {
        let mut fresh: Vec<Alert> = Vec::new();
        for alert in incoming {
            if self.was_evicted(&alert) {
                continue;
            }
            if let Some(idx) = self.position_of(&alert) {
                if alert.is_read {
                    self.items[idx].is_read = true;
                }
                continue;
            }
            if let Some(dup) = fresh.iter_mut().find(|a| same_notification(a, &alert)) {
                dup.is_read |= alert.is_read;
                continue;
            }
            fresh.push(alert);
        }

        let added = fresh.len();
        if added > 0 {
            fresh.append(&mut self.items);
            self.items = fresh;
        }
        let evicted = self.evict_overflow();

        let outcome = MergeOutcome {
            added: added.min(self.cap),
            evicted,
            unread: self.unread_count(),
        };
        debug!("Merged notifications: {:?}", outcome);
        outcome
    }

    /// Returns false when no notification has that id.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.is_read = true;
                true
            }
            None => false,
        }
    }

    /// Marks everything read and returns the ids that were unread.
    pub fn mark_all_read(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        for alert in self.items.iter_mut().filter(|a| !a.is_read) {
            alert.is_read = true;
            changed.push(alert.id.clone());
        }
        if !changed.is_empty() {
            info!("Marked {} notifications read", changed.len());
        }
        changed
    }
}

fn same_notification(a: &Alert, b: &Alert) -> bool {
    a.id == b.id || (!a.message.is_empty() && a.message == b.message)
}

fn dedup_keys(alert: &Alert) -> impl Iterator<Item = String> + '_ {
    let message = (!alert.message.is_empty()).then(|| format!("msg:{}", alert.message));
    std::iter::once(format!("id:{}", alert.id)).chain(message)
}

pub fn rules(store: &LocalStore) -> Vec<AlertRule> {
    store.get_or_default(ALERT_RULES_KEY)
}

/// Normalizes the symbol and rejects rules that could never be evaluated.
pub fn validate_rule(mut rule: AlertRule) -> Result<AlertRule> {
    rule.symbol = normalize_symbol(&rule.symbol);
    if rule.symbol.is_empty() {
        return Err(ClientError::Validation("symbol must not be empty".into()));
    }
    if !rule.value.is_finite() {
        return Err(ClientError::Validation("target value must be a number".into()));
    }
    Ok(rule)
}

/// Stores a rule for local evaluation. Identical rules are kept once.
pub fn add_rule(store: &mut LocalStore, rule: AlertRule) -> Result<bool> {
    let rule = validate_rule(rule)?;
    let mut all = rules(store);
    if all.contains(&rule) {
        return Ok(false);
    }
    all.push(rule);
    store.set(ALERT_RULES_KEY, &all)?;
    Ok(true)
}

/// Produces a notification for every rule whose condition holds at the
/// stock's current price. Ids and messages are stable for a given rule and
/// price so repeated evaluation de-duplicates in the feed.
pub fn evaluate(rules: &[AlertRule], stocks: &[Stock]) -> Vec<Alert> {
    let now = Utc::now();
    rules
        .iter()
        .filter_map(|rule| {
            let stock = stocks.iter().find(|s| s.symbol == rule.symbol)?;
            if !rule.condition.is_met(stock.price, rule.value) {
                return None;
            }
            Some(Alert {
                id: format!("local-{}-{}-{:.2}", rule.symbol, rule.condition, rule.value),
                symbol: rule.symbol.clone(),
                condition: rule.condition,
                value: rule.value,
                message: format!(
                    "{} is {} {:.2} (now {:.2})",
                    rule.symbol,
                    rule.condition.describe(),
                    rule.value,
                    stock.price
                ),
                is_read: false,
                created_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertCondition;
    use chrono::TimeZone;

    fn alert(id: &str, message: &str, is_read: bool) -> Alert {
        Alert {
            id: id.to_string(),
            symbol: "AAPL".to_string(),
            condition: AlertCondition::Above,
            value: 150.0,
            message: message.to_string(),
            is_read,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn stock(symbol: &str, price: f64) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            price,
            volume: 0.0,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    #[test]
    fn local_read_flag_survives_server_resend() {
        let mut feed = NotificationFeed::new(6);
        feed.merge(vec![alert("1", "AAPL above 150", false)]);
        assert!(feed.mark_read("1"));

        let outcome = feed.merge(vec![alert("1", "AAPL above 150", false)]);

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.unread, 0);
        assert!(feed.items()[0].is_read);
    }

    #[test]
    fn new_items_are_prepended_and_oldest_evicted() {
        let mut feed = NotificationFeed::new(3);
        feed.merge(vec![alert("1", "one", false), alert("2", "two", false)]);
        let outcome = feed.merge(vec![alert("3", "three", false), alert("4", "four", false)]);

        let ids: Vec<&str> = feed.items().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "1"]);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(outcome.unread, 3);
    }

    #[test]
    fn duplicates_by_message_are_dropped() {
        let mut feed = NotificationFeed::new(6);
        feed.merge(vec![alert("a", "TSLA below 200", false)]);
        feed.merge(vec![
            alert("b", "TSLA below 200", false),
            alert("c", "NVDA above 900", false),
            alert("d", "NVDA above 900", false),
        ]);
        assert_eq!(feed.items().len(), 2);
    }

    #[test]
    fn mark_all_read_zeroes_unread_count() {
        let mut feed = NotificationFeed::new(6);
        feed.merge(vec![
            alert("1", "one", false),
            alert("2", "two", true),
            alert("3", "three", false),
        ]);

        let changed = feed.mark_all_read();

        assert_eq!(changed, vec!["1".to_string(), "3".to_string()]);
        assert!(feed.items().iter().all(|a| a.is_read));
        assert_eq!(feed.unread_count(), 0);
        assert!(!feed.mark_read("missing"));
    }

    #[test]
    fn evaluate_only_fires_met_rules() {
        let rules = vec![
            AlertRule {
                symbol: "AAPL".into(),
                condition: AlertCondition::Above,
                value: 150.0,
            },
            AlertRule {
                symbol: "MSFT".into(),
                condition: AlertCondition::Below,
                value: 300.0,
            },
            AlertRule {
                symbol: "GOOG".into(),
                condition: AlertCondition::Equals,
                value: 100.0,
            },
        ];
        let stocks = vec![stock("AAPL", 155.0), stock("MSFT", 310.0)];

        let fired = evaluate(&rules, &stocks);

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].message, "AAPL is above 150.00 (now 155.00)");

        let mut feed = NotificationFeed::new(6);
        feed.merge(fired);
        let again = feed.merge(evaluate(&rules, &stocks));
        assert_eq!(again.added, 0);
    }

    #[test]
    fn server_list_larger_than_cap_settles_once_read() {
        let batch: Vec<Alert> = (1..=10)
            .map(|i| alert(&format!("srv-{}", i), &format!("alert {}", i), false))
            .collect();
        let mut feed = NotificationFeed::new(6);

        let first = feed.merge(batch.clone());
        assert_eq!(first.evicted, 4);
        feed.mark_all_read();

        for _ in 0..3 {
            let outcome = feed.merge(batch.clone());
            assert_eq!(outcome.added, 0);
            assert_eq!(outcome.unread, 0);
        }
        let ids: Vec<&str> = feed.items().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["srv-1", "srv-2", "srv-3", "srv-4", "srv-5", "srv-6"]);
    }

    #[test]
    fn evicted_items_stay_forgotten_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("s.json")).unwrap();
        let mut feed = NotificationFeed::new(1);
        feed.merge(vec![alert("old", "old one", false)]);
        feed.merge(vec![alert("new", "new one", false)]);
        feed.save(&mut store).unwrap();

        let mut reloaded = NotificationFeed::load(&store, 1);
        let outcome = reloaded.merge(vec![alert("old", "old one", false)]);

        assert_eq!(outcome.added, 0);
        assert_eq!(reloaded.items()[0].id, "new");
    }

    #[test]
    fn evicted_local_rule_does_not_fire_again() {
        let rule = AlertRule {
            symbol: "AAPL".into(),
            condition: AlertCondition::Above,
            value: 150.0,
        };
        let mut feed = NotificationFeed::new(1);
        feed.merge(evaluate(&[rule.clone()], &[stock("AAPL", 155.0)]));
        feed.merge(vec![alert("srv-1", "server side", false)]);

        let again = feed.merge(evaluate(&[rule], &[stock("AAPL", 160.0)]));

        assert_eq!(again.added, 0);
        assert_eq!(feed.items()[0].id, "srv-1");
    }

    #[test]
    fn non_finite_rule_is_rejected() {
        let rule = AlertRule {
            symbol: " tsla ".into(),
            condition: AlertCondition::Below,
            value: f64::NAN,
        };
        assert!(matches!(validate_rule(rule), Err(ClientError::Validation(_))));

        let ok = validate_rule(AlertRule {
            symbol: " tsla ".into(),
            condition: AlertCondition::Below,
            value: 195.0,
        })
        .unwrap();
        assert_eq!(ok.symbol, "TSLA");
    }
}
