// src/cli.rs
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Terminal client for the stock dashboard backend.
#[derive(Debug, Parser)]
#[command(name = "stock_dashboard", version)]
pub struct Cli {
    /// Backend base URL, e.g. http://localhost:5000
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Path of the local JSON store.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Login(Credentials),
    Register {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        credentials: Credentials,
    },
    VerifyOtp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
    },
    Logout,
    /// Fetch the stock list and show market statistics.
    Stocks {
        /// Only show watched symbols.
        #[arg(long)]
        watched: bool,
    },
    Candles {
        symbol: String,
        #[arg(long, default_value = "1mo")]
        range: String,
    },
    #[command(subcommand)]
    Watch(WatchCommand),
    Buy {
        symbol: String,
        quantity: f64,
        price: f64,
    },
    /// Show holdings valued at the latest prices.
    Portfolio,
    #[command(subcommand)]
    Alerts(AlertCommand),
    /// Ask the AI assistant a question.
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Keep polling stocks and alerts until interrupted.
    Poll,
}

#[derive(Debug, Args)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    Add { symbol: String },
    Remove { symbol: String },
    /// Mark or unmark a symbol as a favorite.
    Favorite { symbol: String },
    List,
}

#[derive(Debug, Subcommand)]
pub enum AlertCommand {
    List,
    Create {
        symbol: String,
        /// ABOVE, BELOW or EQUALS
        condition: String,
        value: f64,
    },
    Read { id: String },
    ReadAll,
}
