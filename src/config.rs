// src/config.rs
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub store_path: PathBuf,
    pub stock_poll_secs: u64,
    pub alert_poll_secs: u64,
    pub notification_cap: usize,
    pub chat_history_cap: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            store_path: PathBuf::from("dashboard_store.json"),
            stock_poll_secs: 30,
            alert_poll_secs: 15,
            notification_cap: 6,
            chat_history_cap: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `DASHBOARD_*` variables; a `.env` file in the
    /// working directory is read first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply(|key| env::var(key).ok());
        config
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DASHBOARD_API_URL") {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("DASHBOARD_STORE") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("DASHBOARD_LOG") {
            self.log_level = level;
        }
        parse_into(&lookup, "DASHBOARD_STOCK_POLL_SECS", &mut self.stock_poll_secs);
        parse_into(&lookup, "DASHBOARD_ALERT_POLL_SECS", &mut self.alert_poll_secs);
        parse_into(&lookup, "DASHBOARD_NOTIFICATION_CAP", &mut self.notification_cap);
        parse_into(&lookup, "DASHBOARD_CHAT_HISTORY_CAP", &mut self.chat_history_cap);
    }
}

/// Overwrites `slot` with a positive number from `key`. Zero and anything
/// unparsable are logged and leave the current value in place.
fn parse_into<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: FromStr + Default + PartialEq,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) if value == T::default() => {
                warn!("Ignoring {}={:?}: must be greater than zero", key, raw)
            }
            Ok(value) => *slot = value,
            Err(_) => warn!("Ignoring {}={:?}: not a valid number", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.stock_poll_secs, 30);
        assert_eq!(config.alert_poll_secs, 15);
        assert_eq!(config.notification_cap, 6);
    }

    #[test]
    fn env_overrides_and_bad_numbers_are_ignored() {
        let vars: HashMap<&str, &str> = [
            ("DASHBOARD_API_URL", "http://10.0.0.2:8001/"),
            ("DASHBOARD_ALERT_POLL_SECS", "20"),
            ("DASHBOARD_NOTIFICATION_CAP", "lots"),
            ("DASHBOARD_STOCK_POLL_SECS", "0"),
            ("DASHBOARD_CHAT_HISTORY_CAP", " 0 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://10.0.0.2:8001");
        assert_eq!(config.alert_poll_secs, 20);
        assert_eq!(config.notification_cap, 6);
        assert_eq!(config.stock_poll_secs, 30);
        assert_eq!(config.chat_history_cap, 50);
    }
}
