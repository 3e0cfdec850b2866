// src/market.rs
use crate::models::{normalize_symbol, Stock};
use serde::Serialize;
use std::collections::HashMap;

/// Last known quotes keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: HashMap<String, Stock>,
}

impl QuoteBook {
    /// Replaces quotes for every symbol in `fetched`. Symbols the backend did
    /// not resend keep their last known quote. Returns how many were updated.
    pub fn merge(&mut self, fetched: Vec<Stock>) -> usize {
        let mut updated = 0;
        for mut stock in fetched {
            stock.symbol = normalize_symbol(&stock.symbol);
            if stock.symbol.is_empty() {
                continue;
            }
            self.quotes.insert(stock.symbol.clone(), stock);
            updated += 1;
        }
        updated
    }

    pub fn get(&self, symbol: &str) -> Option<&Stock> {
        self.quotes.get(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Stocks sorted by symbol.
    pub fn stocks(&self) -> Vec<Stock> {
        let mut all: Vec<Stock> = self.quotes.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    pub fn prices(&self) -> HashMap<String, f64> {
        self.quotes
            .iter()
            .map(|(symbol, stock)| (symbol.clone(), stock.price))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub count: usize,
    pub average_price: f64,
    pub total_volume: f64,
    pub average_change_percent: f64,
}

pub fn stats(stocks: &[Stock]) -> MarketStats {
    if stocks.is_empty() {
        return MarketStats::default();
    }
    let n = stocks.len() as f64;
    MarketStats {
        count: stocks.len(),
        average_price: stocks.iter().map(|s| s.price).sum::<f64>() / n,
        total_volume: stocks.iter().map(|s| s.volume).sum(),
        average_change_percent: stocks.iter().map(Stock::change_percent).sum::<f64>() / n,
    }
}

/// Top `n` stocks by session change, best first. Ties break on symbol.
pub fn top_gainers(stocks: &[Stock], n: usize) -> Vec<Stock> {
    let mut ranked = stocks.to_vec();
    ranked.sort_by(|a, b| {
        b.change_percent()
            .total_cmp(&a.change_percent())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(n);
    ranked
}

/// Bottom `n` stocks by session change, worst first.
pub fn top_losers(stocks: &[Stock], n: usize) -> Vec<Stock> {
    let mut ranked = stocks.to_vec();
    ranked.sort_by(|a, b| {
        a.change_percent()
            .total_cmp(&b.change_percent())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(n);
    ranked
}

pub fn filter_watched(stocks: &[Stock], watched: &[String]) -> Vec<Stock> {
    stocks
        .iter()
        .filter(|s| watched.iter().any(|w| *w == s.symbol))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(symbol: &str, open: f64, close: f64, volume: f64) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            price: close,
            volume,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
        }
    }

    #[test]
    fn merge_replaces_by_symbol_and_keeps_missing() {
        let mut book = QuoteBook::default();
        book.merge(vec![stock("AAPL", 1.0, 2.0, 10.0), stock("msft", 1.0, 1.0, 5.0)]);
        let updated = book.merge(vec![
            stock("AAPL", 2.0, 3.0, 10.0),
            stock("AAPL", 2.0, 4.0, 10.0),
        ]);

        assert_eq!(updated, 2);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("aapl").map(|s| s.price), Some(4.0));
        assert!(book.get("MSFT").is_some());
    }

    #[test]
    fn stats_average_over_fetched_list() {
        let stocks = vec![stock("A", 100.0, 110.0, 10.0), stock("B", 100.0, 90.0, 30.0)];
        let s = stats(&stocks);
        assert_eq!(s.count, 2);
        assert_eq!(s.average_price, 100.0);
        assert_eq!(s.total_volume, 40.0);
        assert_eq!(s.average_change_percent, 0.0);
        assert_eq!(stats(&[]), MarketStats::default());
    }

    #[test]
    fn gainers_and_losers_are_ranked() {
        let stocks = vec![
            stock("A", 100.0, 105.0, 0.0),
            stock("B", 100.0, 120.0, 0.0),
            stock("C", 100.0, 80.0, 0.0),
            stock("D", 100.0, 105.0, 0.0),
        ];
        let gainers: Vec<String> = top_gainers(&stocks, 3).into_iter().map(|s| s.symbol).collect();
        assert_eq!(gainers, vec!["B", "A", "D"]);
        let losers: Vec<String> = top_losers(&stocks, 1).into_iter().map(|s| s.symbol).collect();
        assert_eq!(losers, vec!["C"]);
    }

    #[test]
    fn filter_watched_keeps_only_watchlist() {
        let stocks = vec![stock("A", 1.0, 1.0, 0.0), stock("B", 1.0, 1.0, 0.0)];
        let watched = filter_watched(&stocks, &["B".to_string()]);
        assert_eq!(watched.len(), 1);
        assert_eq!(watched[0].symbol, "B");
    }
}
