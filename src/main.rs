// src/main.rs
mod cli;

use crate::cli::{AlertCommand, Cli, Command, WatchCommand};
use clap::Parser;
use env_logger::Builder;
use log::{error, info};
use serde::Serialize;
use stock_dashboard::models::AlertCondition;
use stock_dashboard::poller::{self, Feed};
use stock_dashboard::{market, ClientError, Config, Dashboard};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = &cli.store {
        config.store_path = path.clone();
    }

    Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli, &config).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        if matches!(e, ClientError::Unauthorized | ClientError::NotLoggedIn) {
            eprintln!("run `stock_dashboard login --email <EMAIL>` first");
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, config: &Config) -> Result<(), ClientError> {
    let mut dashboard = Dashboard::open(config)?;
    let json = cli.json;

    match cli.command {
        Command::Login(creds) => {
            dashboard.login(&creds.email, &creds.password).await?;
            println!("Logged in as {}", creds.email);
        }
        Command::Register { name, credentials } => {
            let message = dashboard
                .register(&name, &credentials.email, &credentials.password)
                .await?;
            println!("{}", message);
        }
        Command::VerifyOtp { email, otp } => {
            dashboard.verify_otp(&email, &otp).await?;
            println!("Verified, logged in as {}", email);
        }
        Command::Logout => {
            dashboard.logout().await?;
            println!("Logged out");
        }
        Command::Stocks { watched } => {
            let mut stocks = dashboard.refresh_stocks().await?;
            if watched {
                stocks = market::filter_watched(&stocks, &dashboard.watchlist().await);
            }
            let stats = market::stats(&stocks);
            if json {
                print_json(&serde_json::json!({ "stocks": stocks, "stats": stats }))?;
            } else {
                for s in &stocks {
                    println!(
                        "{:<8} {:>12} {:>+8.2}% vol {:.0}",
                        s.symbol,
                        s.format_price(),
                        s.change_percent(),
                        s.volume
                    );
                }
                println!(
                    "{} stocks, avg price {:.2}, avg change {:+.2}%, total volume {:.0}",
                    stats.count, stats.average_price, stats.average_change_percent, stats.total_volume
                );
                if let Some(best) = market::top_gainers(&stocks, 1).first() {
                    println!("Top gainer: {} ({:+.2}%)", best.symbol, best.change_percent());
                }
                if let Some(worst) = market::top_losers(&stocks, 1).first() {
                    println!("Top loser: {} ({:+.2}%)", worst.symbol, worst.change_percent());
                }
            }
        }
        Command::Candles { symbol, range } => {
            let candles = dashboard.candles(&symbol, &range).await?;
            if json {
                print_json(&candles)?;
            } else {
                for c in &candles {
                    println!(
                        "{} O {:.2} H {:.2} L {:.2} C {:.2}",
                        c.time.format("%Y-%m-%d %H:%M"),
                        c.open,
                        c.high,
                        c.low,
                        c.close
                    );
                }
            }
        }
        Command::Watch(cmd) => match cmd {
            WatchCommand::Add { symbol } => {
                if dashboard.watch(&symbol).await? {
                    println!("Added {}", symbol.to_ascii_uppercase());
                } else {
                    println!("{} is already on the watchlist", symbol.to_ascii_uppercase());
                }
            }
            WatchCommand::Remove { symbol } => {
                if dashboard.unwatch(&symbol).await? {
                    println!("Removed {}", symbol.to_ascii_uppercase());
                } else {
                    println!("{} was not on the watchlist", symbol.to_ascii_uppercase());
                }
            }
            WatchCommand::Favorite { symbol } => {
                let symbol = symbol.to_ascii_uppercase();
                if dashboard.toggle_favorite(&symbol).await? {
                    println!("{} marked as favorite", symbol);
                } else {
                    println!("{} is no longer a favorite", symbol);
                }
            }
            WatchCommand::List => {
                let symbols = dashboard.watchlist().await;
                let favorites = dashboard.favorites().await;
                if json {
                    print_json(&serde_json::json!({ "watchlist": symbols, "favorites": favorites }))?;
                } else {
                    for s in &symbols {
                        let mark = if favorites.contains(s) { '*' } else { ' ' };
                        println!("{} {}", mark, s);
                    }
                }
            }
        },
        Command::Buy {
            symbol,
            quantity,
            price,
        } => {
            let position = dashboard.buy(&symbol, quantity, price).await?;
            println!(
                "Holding {} {} at {:.2}",
                position.quantity, position.symbol, position.buy_price
            );
        }
        Command::Portfolio => {
            // Best effort price refresh; stale or buy prices are used otherwise.
            if let Err(e) = dashboard.refresh_stocks().await {
                info!("Valuing portfolio without fresh prices: {}", e);
            }
            let summary = dashboard.portfolio_summary().await;
            if json {
                print_json(&summary)?;
            } else {
                for h in &summary.holdings {
                    println!(
                        "{:<8} {:>8} @ {:>10.2} now {:>10.2}  P&L {:>+10.2} ({:+.2}%)",
                        h.symbol, h.quantity, h.buy_price, h.current_price, h.pnl, h.pnl_percent
                    );
                }
                println!(
                    "Invested {:.2}, value {:.2}, P&L {:+.2} ({:+.2}%)",
                    summary.total_invested,
                    summary.total_value,
                    summary.total_pnl,
                    summary.total_pnl_percent
                );
            }
        }
        Command::Alerts(cmd) => match cmd {
            AlertCommand::List => {
                if let Err(e) = dashboard.refresh_alerts().await {
                    info!("Showing cached notifications: {}", e);
                }
                let (items, unread) = dashboard.notifications().await;
                if json {
                    print_json(&serde_json::json!({ "notifications": items, "unread": unread }))?;
                } else {
                    for a in &items {
                        let mark = if a.is_read { ' ' } else { '*' };
                        println!("{} [{}] {} {}", mark, a.id, a.created_at.format("%m-%d %H:%M"), a.message);
                    }
                    println!("{} unread", unread);
                }
            }
            AlertCommand::Create {
                symbol,
                condition,
                value,
            } => {
                let condition: AlertCondition =
                    condition.parse().map_err(ClientError::Validation)?;
                let alert = dashboard.create_alert(&symbol, condition, value).await?;
                println!("Alert {} set: {} {} {:.2}", alert.id, alert.symbol, alert.condition, alert.value);
            }
            AlertCommand::Read { id } => {
                if !dashboard.mark_read(&id).await? {
                    return Err(ClientError::Validation(format!("no notification with id {}", id)));
                }
            }
            AlertCommand::ReadAll => {
                let n = dashboard.mark_all_read().await?;
                println!("Marked {} notifications read", n);
            }
        },
        Command::Ask { query } => {
            let answer = dashboard.ask(&query.join(" ")).await?;
            println!("{}", answer);
        }
        Command::Poll => {
            dashboard.token().await?;
            let stocks = poller::spawn(
                Feed::Stocks,
                dashboard.api().clone(),
                dashboard.state(),
                Duration::from_secs(config.stock_poll_secs),
            );
            let alerts = poller::spawn(
                Feed::Alerts,
                dashboard.api().clone(),
                dashboard.state(),
                Duration::from_secs(config.alert_poll_secs),
            );
            info!("Polling {}, press Ctrl-C to stop", dashboard.api().base_url());
            tokio::signal::ctrl_c().await?;
            stocks.abort();
            alerts.abort();
            info!("Stopped polling.");
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
