// src/portfolio.rs
use crate::db::{LocalStore, PORTFOLIO_KEY};
use crate::error::{ClientError, Result};
use crate::models::{normalize_symbol, PortfolioPosition};
use log::info;
use serde::Serialize;
use std::collections::HashMap;

pub fn positions(store: &LocalStore) -> Vec<PortfolioPosition> {
    store.get_or_default(PORTFOLIO_KEY)
}

/// Records a buy. The first buy of a symbol fixes its buy price; later buys
/// only add to the quantity.
pub fn buy(
    store: &mut LocalStore,
    symbol: &str,
    quantity: f64,
    price: f64,
) -> Result<PortfolioPosition> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(ClientError::Validation("symbol must not be empty".into()));
    }
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ClientError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(ClientError::Validation(format!(
            "price must not be negative, got {}",
            price
        )));
    }

    let mut held = positions(store);
    let position = match held.iter_mut().find(|p| p.symbol == symbol) {
        Some(existing) => {
            existing.quantity += quantity;
            existing.clone()
        }
        None => {
            let created = PortfolioPosition {
                symbol,
                quantity,
                buy_price: price,
            };
            held.push(created.clone());
            created
        }
    };
    store.set(PORTFOLIO_KEY, &held)?;
    info!(
        "Holding {} x {} (bought at {:.2})",
        position.quantity, position.symbol, position.buy_price
    );
    Ok(position)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub invested: f64,
    pub value: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub holdings: Vec<Holding>,
    pub total_invested: f64,
    pub total_value: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
}

/// Values every position at the given prices. A position without a known
/// price is valued at its buy price.
pub fn summarize(positions: &[PortfolioPosition], prices: &HashMap<String, f64>) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    for p in positions {
        let current_price = prices.get(&p.symbol).copied().unwrap_or(p.buy_price);
        let invested = p.buy_price * p.quantity;
        let value = current_price * p.quantity;
        let pnl = (current_price - p.buy_price) * p.quantity;
        summary.total_invested += invested;
        summary.total_value += value;
        summary.total_pnl += pnl;
        summary.holdings.push(Holding {
            symbol: p.symbol.clone(),
            quantity: p.quantity,
            buy_price: p.buy_price,
            current_price,
            invested,
            value,
            pnl,
            pnl_percent: percent(pnl, invested),
        });
    }
    summary.total_pnl_percent = percent(summary.total_pnl, summary.total_invested);
    summary
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}
