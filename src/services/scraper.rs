// src/services/scraper.rs

//! Page scraper.
//!
//! Snapshots the rendered grid and turns its rows into records.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::{Config, Record};
use crate::services::PageTracker;
use crate::services::normalize::build_record;
use crate::utils::retry::{RetryPolicy, retry_async};

pub struct PageScraper {
    table_selector: Selector,
    settle_delay: Duration,
    retry: RetryPolicy,
}

impl PageScraper {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            table_selector: parse_selector(&config.site.table_selector)?,
            settle_delay: config.wait.settle_delay(),
            retry: config.retry.table.clone(),
        })
    }

    /// Extract every payment row on the page the grid is showing.
    ///
    /// A page without a table is retried (the grid may still be re-rendering);
    /// a table with no payment rows is a valid, empty page.
    pub async fn scrape_current_page<D: PageDriver>(
        &self,
        driver: &D,
        tracker: &mut PageTracker,
    ) -> Result<Vec<Record>> {
        tracker.refresh(driver).await;
        let page = tracker.current_page().max(1);

        let rows = retry_async(&self.retry, &format!("Table read on page {page}"), move |attempt| {
            self.snapshot_rows(driver, page, attempt)
        })
        .await
        .map_err(|(e, _)| e)?;

        let records: Vec<Record> = rows
            .iter()
            .filter_map(|cells| build_record(cells, page))
            .collect();

        log::debug!(
            "Page {}: {} rows, {} records",
            page,
            rows.len(),
            records.len()
        );
        Ok(records)
    }

    async fn snapshot_rows<D: PageDriver>(
        &self,
        driver: &D,
        page: u32,
        attempt: u32,
    ) -> Result<Vec<Vec<String>>> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        let html = driver.page_source().await?;
        parse_table(&html, &self.table_selector).ok_or(AppError::TableMissing {
            page,
            attempts: attempt,
        })
    }
}

/// Cell texts of every row after the header row of the first table matching
/// `selector`. `None` when the document has no such table.
pub fn parse_table(html: &str, selector: &Selector) -> Option<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let table = document.select(selector).next()?;

    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let rows = table
        .select(&row_sel)
        .skip(1)
        .map(|row| row.select(&cell_sel).map(cell_text).collect())
        .collect();
    Some(rows)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}
