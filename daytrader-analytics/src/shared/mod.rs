/// Shared modules for the Daytrader Agents analytics pipeline
pub mod activity;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod keywords;
pub mod mentions;
pub mod orchestrator;
pub mod price_window;
pub mod sentiment;
pub mod source;
pub mod threads;
pub mod types;
pub mod view;
