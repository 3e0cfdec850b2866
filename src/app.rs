// src/app.rs
use crate::alerts::{self, MergeOutcome, NotificationFeed};
use crate::api::ApiClient;
use crate::assistant::{validate_query, ChatHistory};
use crate::auth;
use crate::config::Config;
use crate::db::LocalStore;
use crate::error::{ClientError, Result};
use crate::market::QuoteBook;
use crate::models::{
    normalize_symbol, Alert, AlertCondition, AlertRule, Candle, ChatRole, PortfolioPosition,
    Session, Stock,
};
use crate::portfolio::{self, PortfolioSummary};
use crate::watchlist;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything the pollers and user actions mutate.
#[derive(Debug)]
pub struct DashboardState {
    pub store: LocalStore,
    pub feed: NotificationFeed,
    pub quotes: QuoteBook,
}

impl DashboardState {
    pub fn load(store: LocalStore, notification_cap: usize) -> Self {
        let feed = NotificationFeed::load(&store, notification_cap);
        Self {
            store,
            feed,
            quotes: QuoteBook::default(),
        }
    }

    /// Merges quotes, then feeds any locally triggered rules into the
    /// notification feed.
    pub fn apply_stocks(&mut self, stocks: Vec<Stock>) -> Result<MergeOutcome> {
        let updated = self.quotes.merge(stocks);
        let triggered = alerts::evaluate(&alerts::rules(&self.store), &self.quotes.stocks());
        let outcome = self.feed.merge(triggered);
        if outcome.added > 0 {
            self.feed.save(&mut self.store)?;
        }
        info!(
            "Quotes refreshed: {} updated, {} new notifications",
            updated, outcome.added
        );
        Ok(outcome)
    }

    pub fn apply_alerts(&mut self, fetched: Vec<Alert>) -> Result<MergeOutcome> {
        let outcome = self.feed.merge(fetched);
        self.feed.save(&mut self.store)?;
        info!(
            "Alerts refreshed: {} new, {} unread",
            outcome.added, outcome.unread
        );
        Ok(outcome)
    }
}

pub type SharedState = Arc<Mutex<DashboardState>>;

pub struct Dashboard {
    api: ApiClient,
    state: SharedState,
    chat: ChatHistory,
}

impl Dashboard {
    pub fn open(config: &Config) -> Result<Self> {
        let store = LocalStore::open(&config.store_path)?;
        let api = ApiClient::new(config.api_base_url.clone())?;
        Ok(Self::new(
            api,
            DashboardState::load(store, config.notification_cap),
            config.chat_history_cap,
        ))
    }

    pub fn new(api: ApiClient, state: DashboardState, chat_history_cap: usize) -> Self {
        let chat = ChatHistory::load(&state.store, chat_history_cap);
        Self {
            api,
            state: Arc::new(Mutex::new(state)),
            chat,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn chat(&self) -> &ChatHistory {
        &self.chat
    }

    pub async fn token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        auth::require_token(&mut state.store)
    }

    /// Clears the session when the backend rejected the token.
    async fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ClientError::Unauthorized) = &result {
            warn!("Backend rejected the session token, logging out");
            let mut state = self.state.lock().await;
            auth::logout(&mut state.store)?;
        }
        result
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let token = self.api.login(email, password).await?;
        self.start_session(email, token).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String> {
        self.api.register(name, email, password).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<()> {
        let token = self.api.verify_otp(email, otp).await?;
        self.start_session(email, token).await
    }

    async fn start_session(&self, email: &str, token: String) -> Result<()> {
        let mut state = self.state.lock().await;
        auth::save_session(
            &mut state.store,
            &Session {
                token,
                email: email.to_string(),
            },
        )
    }

    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        auth::logout(&mut state.store)
    }

    pub async fn refresh_stocks(&self) -> Result<Vec<Stock>> {
        let token = self.token().await?;
        let stocks = self.guard(self.api.stocks(&token).await).await?;
        let mut state = self.state.lock().await;
        state.apply_stocks(stocks)?;
        Ok(state.quotes.stocks())
    }

    pub async fn refresh_alerts(&self) -> Result<MergeOutcome> {
        let token = self.token().await?;
        let fetched = self.guard(self.api.alerts(&token).await).await?;
        let mut state = self.state.lock().await;
        state.apply_alerts(fetched)
    }

    pub async fn candles(&self, symbol: &str, range: &str) -> Result<Vec<Candle>> {
        let token = self.token().await?;
        let symbol = normalize_symbol(symbol);
        self.guard(self.api.candles(&token, &symbol, range).await)
            .await
    }

    pub async fn watch(&self, symbol: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        watchlist::add(&mut state.store, symbol)
    }

    pub async fn unwatch(&self, symbol: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        watchlist::remove(&mut state.store, symbol)
    }

    pub async fn toggle_favorite(&self, symbol: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        watchlist::toggle_favorite(&mut state.store, symbol)
    }

    pub async fn favorites(&self) -> Vec<String> {
        let state = self.state.lock().await;
        watchlist::favorites(&state.store)
    }

    pub async fn watchlist(&self) -> Vec<String> {
        let state = self.state.lock().await;
        watchlist::symbols(&state.store)
    }

    /// Records the buy locally, then mirrors it to the backend when logged
    /// in. A failed mirror is logged and does not undo the local buy.
    pub async fn buy(&self, symbol: &str, quantity: f64, price: f64) -> Result<PortfolioPosition> {
        let position = {
            let mut state = self.state.lock().await;
            portfolio::buy(&mut state.store, symbol, quantity, price)?
        };
        if let Ok(token) = self.token().await {
            let mirrored = self
                .guard(
                    self.api
                        .portfolio_buy(&token, &position.symbol, quantity, price)
                        .await,
                )
                .await;
            if let Err(e) = mirrored {
                warn!("Buy of {} not synced to backend: {}", position.symbol, e);
            }
        }
        Ok(position)
    }

    pub async fn portfolio_summary(&self) -> PortfolioSummary {
        let state = self.state.lock().await;
        portfolio::summarize(&portfolio::positions(&state.store), &state.quotes.prices())
    }

    pub async fn notifications(&self) -> (Vec<Alert>, usize) {
        let state = self.state.lock().await;
        (state.feed.items().to_vec(), state.feed.unread_count())
    }

    /// Creates the alert on the backend and keeps the rule for local
    /// evaluation. Invalid rules are rejected before anything is sent.
    pub async fn create_alert(
        &self,
        symbol: &str,
        condition: AlertCondition,
        value: f64,
    ) -> Result<Alert> {
        let rule = alerts::validate_rule(AlertRule {
            symbol: symbol.to_string(),
            condition,
            value,
        })?;
        let token = self.token().await?;
        let created = self
            .guard(
                self.api
                    .create_alert(&token, &rule.symbol, condition, value)
                    .await,
            )
            .await?;
        let mut state = self.state.lock().await;
        alerts::add_rule(&mut state.store, rule)?;
        Ok(created)
    }

    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        let found = {
            let mut state = self.state.lock().await;
            let found = state.feed.mark_read(id);
            if found {
                let DashboardState { store, feed, .. } = &mut *state;
                feed.save(store)?;
            }
            found
        };
        if found {
            self.sync_read(&[id.to_string()]).await;
        }
        Ok(found)
    }

    pub async fn mark_all_read(&self) -> Result<usize> {
        let changed = {
            let mut state = self.state.lock().await;
            let changed = state.feed.mark_all_read();
            let DashboardState { store, feed, .. } = &mut *state;
            feed.save(store)?;
            changed
        };
        self.sync_read(&changed).await;
        Ok(changed.len())
    }

    /// Best effort: local read marks stand even if the backend is unreachable.
    async fn sync_read(&self, ids: &[String]) {
        let token = match self.token().await {
            Ok(token) => token,
            Err(_) => return,
        };
        for id in ids.iter().filter(|id| !id.starts_with("local-")) {
            if let Err(e) = self.guard(self.api.mark_alert_read(&token, id).await).await {
                warn!("Could not mark alert {} read on backend: {}", id, e);
                if matches!(e, ClientError::Unauthorized) {
                    return;
                }
            }
        }
    }

    pub async fn ask(&mut self, query: &str) -> Result<String> {
        let query = validate_query(query)?.to_string();
        let token = self.token().await?;
        let answer = self.guard(self.api.ask(&token, &query).await).await?;
        self.chat.push(ChatRole::User, query);
        self.chat.push(ChatRole::Assistant, answer.clone());
        let mut state = self.state.lock().await;
        self.chat.save(&mut state.store)?;
        Ok(answer)
    }
}
