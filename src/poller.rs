// src/poller.rs
use crate::api::ApiClient;
use crate::app::SharedState;
use crate::auth;
use crate::error::{ClientError, Result};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Stocks,
    Alerts,
}

/// One fetch-and-merge round. Returns the feed's unread count afterwards.
pub async fn poll_once(feed: Feed, api: &ApiClient, state: &SharedState) -> Result<usize> {
    let token = {
        let mut guard = state.lock().await;
        auth::require_token(&mut guard.store)?
    };
    match feed {
        Feed::Stocks => {
            let stocks = api.stocks(&token).await?;
            let mut guard = state.lock().await;
            Ok(guard.apply_stocks(stocks)?.unread)
        }
        Feed::Alerts => {
            let alerts = api.alerts(&token).await?;
            let mut guard = state.lock().await;
            Ok(guard.apply_alerts(alerts)?.unread)
        }
    }
}

const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Polls `feed` every `period` until the task is aborted. Failures leave the
/// current state untouched and wait for the next tick; a 401 clears the
/// session. Ticks never overlap because the fetch is awaited in-loop.
/// Periods shorter than 10ms are raised to 10ms.
pub fn spawn(feed: Feed, api: ApiClient, state: SharedState, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("{:?} poller started, every {:?}", feed, period);
        loop {
            ticker.tick().await;
            match poll_once(feed, &api, &state).await {
                Ok(unread) => debug!("{:?} poll done, {} unread", feed, unread),
                Err(ClientError::NotLoggedIn) => debug!("{:?} poll skipped: not logged in", feed),
                Err(ClientError::Unauthorized) => {
                    warn!("{:?} poll rejected, clearing session", feed);
                    let mut guard = state.lock().await;
                    if let Err(e) = auth::logout(&mut guard.store) {
                        warn!("Failed to clear session: {}", e);
                    }
                }
                Err(e) => warn!("{:?} poll failed, keeping previous state: {}", feed, e),
            }
        }
    })
}
