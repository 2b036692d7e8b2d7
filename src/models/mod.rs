// src/models/mod.rs

//! Domain models for the crawler application.

mod config;
mod position;
mod record;

// Re-export all public types
pub use config::{
    BrowserConfig, Config, OutputConfig, RetryConfig, SiteConfig, WaitConfig, ensure_csv_suffix,
};
pub use position::ScrapePosition;
pub use record::{Category, LOG_HEADER, LogEntry, Record};
