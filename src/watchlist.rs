// src/watchlist.rs
use crate::db::{LocalStore, FAVORITES_KEY, WATCHLIST_KEY};
use crate::error::{ClientError, Result};
use crate::models::{normalize_symbol, WatchlistEntry};
use log::info;

pub fn entries(store: &LocalStore) -> Vec<WatchlistEntry> {
    store.get_or_default(WATCHLIST_KEY)
}

pub fn symbols(store: &LocalStore) -> Vec<String> {
    entries(store).into_iter().map(|e| e.symbol).collect()
}

pub fn contains(store: &LocalStore, symbol: &str) -> bool {
    let symbol = normalize_symbol(symbol);
    entries(store).iter().any(|e| e.symbol == symbol)
}

/// Appends `symbol` unless it is already watched. Returns whether it was added.
pub fn add(store: &mut LocalStore, symbol: &str) -> Result<bool> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(ClientError::Validation("symbol must not be empty".into()));
    }
    let mut list = entries(store);
    if list.iter().any(|e| e.symbol == symbol) {
        return Ok(false);
    }
    info!("Watching {}", symbol);
    list.push(WatchlistEntry { symbol });
    store.set(WATCHLIST_KEY, &list)?;
    Ok(true)
}

/// Returns whether anything was removed; unknown symbols are a no-op.
pub fn remove(store: &mut LocalStore, symbol: &str) -> Result<bool> {
    let symbol = normalize_symbol(symbol);
    let mut list = entries(store);
    let before = list.len();
    list.retain(|e| e.symbol != symbol);
    if list.len() == before {
        return Ok(false);
    }
    info!("Stopped watching {}", symbol);
    store.set(WATCHLIST_KEY, &list)?;
    Ok(true)
}

pub fn favorites(store: &LocalStore) -> Vec<String> {
    store.get_or_default(FAVORITES_KEY)
}

/// Flips the favorite mark on `symbol` and returns whether it is now a
/// favorite.
pub fn toggle_favorite(store: &mut LocalStore, symbol: &str) -> Result<bool> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(ClientError::Validation("symbol must not be empty".into()));
    }
    let mut marked = favorites(store);
    let now_favorite = match marked.iter().position(|s| *s == symbol) {
        Some(idx) => {
            marked.remove(idx);
            false
        }
        None => {
            marked.push(symbol);
            true
        }
    };
    store.set(FAVORITES_KEY, &marked)?;
    Ok(now_favorite)
}
