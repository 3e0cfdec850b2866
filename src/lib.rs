// src/lib.rs
pub mod alerts;
pub mod api;
pub mod app;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod market;
pub mod models;
pub mod poller;
pub mod portfolio;
pub mod watchlist;

pub use app::{Dashboard, DashboardState, SharedState};
pub use config::Config;
pub use error::{ClientError, Result};
