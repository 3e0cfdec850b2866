// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latest quote for one symbol as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub close: f64,
}

impl Stock {
    /// Session change in percent, `(close - open) / open * 100`.
    pub fn change_percent(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open * 100.0
    }

    pub fn format_price(&self) -> String {
        format!("${:.2}", self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPosition {
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertCondition {
    Above,
    Below,
    Equals,
}

impl AlertCondition {
    pub fn is_met(self, price: f64, target: f64) -> bool {
        match self {
            AlertCondition::Above => price > target,
            AlertCondition::Below => price < target,
            AlertCondition::Equals => (price - target).abs() < 0.01,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
            AlertCondition::Equals => "at",
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertCondition::Above => "ABOVE",
            AlertCondition::Below => "BELOW",
            AlertCondition::Equals => "EQUALS",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AlertCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ABOVE" => Ok(AlertCondition::Above),
            "BELOW" => Ok(AlertCondition::Below),
            "EQUALS" => Ok(AlertCondition::Equals),
            other => Err(format!("unknown alert condition: {}", other)),
        }
    }
}

/// A notification produced by a triggered alert, either sent by the
/// backend or synthesized locally from a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub symbol: String,
    pub condition: AlertCondition,
    #[serde(alias = "targetValue")]
    pub value: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Locally known price threshold used for client-side evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub symbol: String,
    pub condition: AlertCondition,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Normalizes user-typed tickers so symbol-keyed collections compare equal.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_percent_handles_zero_open() {
        let stock = Stock {
            symbol: "AAPL".into(),
            price: 10.0,
            volume: 0.0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 10.0,
        };
        assert_eq!(stock.change_percent(), 0.0);
    }

    #[test]
    fn alert_deserializes_from_backend_shape() {
        let raw = r#"{
            "id": "a1",
            "symbol": "TSLA",
            "condition": "BELOW",
            "targetValue": 200.0,
            "message": "TSLA dropped",
            "isRead": false,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let alert: Alert = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.condition, AlertCondition::Below);
        assert_eq!(alert.value, 200.0);
        assert!(!alert.is_read);
    }

    #[test]
    fn condition_parsing_is_case_insensitive() {
        assert_eq!("above".parse::<AlertCondition>(), Ok(AlertCondition::Above));
        assert!("sideways".parse::<AlertCondition>().is_err());
        assert!(AlertCondition::Equals.is_met(100.004, 100.0));
        assert!(!AlertCondition::Above.is_met(100.0, 100.0));
    }
}
