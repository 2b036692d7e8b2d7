//! Service layer for the crawler application.
//!
//! This module contains the page-level logic:
//! - Row normalization and fingerprints (`normalize`)
//! - Pager position tracking (`PageTracker`)
//! - Verified forward navigation (`Navigator`)
//! - Table extraction (`PageScraper`)

pub mod normalize;
mod navigator;
mod scraper;
mod tracker;

pub use navigator::{NavOutcome, NavState, Navigator};
pub use scraper::{PageScraper, parse_table};
pub use tracker::PageTracker;
