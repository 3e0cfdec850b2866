// src/db.rs
use crate::error::Result;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const WATCHLIST_KEY: &str = "watchlist";
pub const PORTFOLIO_KEY: &str = "portfolio";
pub const FAVORITES_KEY: &str = "favorites";
pub const NOTIFICATIONS_KEY: &str = "notifications";
pub const NOTIFICATIONS_SEEN_KEY: &str = "notificationsSeen";
pub const CHAT_HISTORY_KEY: &str = "chatHistory";
pub const ALERT_RULES_KEY: &str = "alertRules";
pub const SESSION_KEY: &str = "session";

/// Key-value state persisted as a single JSON object on disk.
///
/// Every mutation is written through immediately. A missing file is an empty
/// store; an unreadable one is logged and replaced on the next write.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Store at {} is corrupt, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty.", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a key, treating a value of the wrong shape as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Discarding malformed value under {:?}: {}", key, e);
                None
            }
        }
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key).unwrap_or_default()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.entries
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Store flushed to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(FAVORITES_KEY, &vec!["AAPL", "MSFT"]).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        let favorites: Vec<String> = reopened.get_or_default(FAVORITES_KEY);
        assert_eq!(favorites, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = LocalStore::open(&path).unwrap();
        let favorites: Vec<String> = store.get_or_default(FAVORITES_KEY);
        assert!(favorites.is_empty());
    }

    #[test]
    fn wrong_shape_reads_as_absent() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("s.json")).unwrap();
        store.set(WATCHLIST_KEY, &"AAPL").unwrap();
        assert_eq!(store.get::<Vec<String>>(WATCHLIST_KEY), None);

        store.remove(WATCHLIST_KEY).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get::<String>(WATCHLIST_KEY), None);
    }
}
