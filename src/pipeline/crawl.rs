// src/pipeline/crawl.rs

//! Payments crawling pipeline.

use tokio_util::sync::CancellationToken;

use crate::browser::PageDriver;
use crate::error::Result;
use crate::models::Config;
use crate::storage::{RecordLog, RecordStore};
use crate::utils::log::{header, summary};

use super::session::{Session, SessionReport};

/// Run one crawl session over the payments grid and log its summary.
pub async fn run_crawler<D: PageDriver, L: RecordLog>(
    config: &Config,
    driver: D,
    store: RecordStore<L>,
    cancel: CancellationToken,
) -> Result<SessionReport> {
    header("NHIS payments crawler");
    log::info!(
        "{} records already logged, resuming at page {}",
        store.known_count(),
        store.resume_page().max(1)
    );

    let mut session = Session::new(config, driver, store, cancel)?;
    let report = session.run().await?;

    let elapsed = report.end_time - report.start_time;
    summary(
        "Crawl",
        &[
            ("Final state", format!("{:?}", report.final_state)),
            ("Last page", report.last_page.to_string()),
            ("Pages scraped", report.pages_scraped.to_string()),
            ("New records", report.appended.to_string()),
            ("Already recorded", report.duplicates.to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    Ok(report)
}
