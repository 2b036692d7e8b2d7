// src/services/tracker.rs

//! Page state tracker.
//!
//! Reads the pager's active page and page count off the live page. It is the
//! only writer of [`ScrapePosition`].

use crate::browser::PageDriver;
use crate::error::Result;
use crate::models::{ScrapePosition, SiteConfig};
use crate::utils::parse_page_number;

pub struct PageTracker {
    current_page_selector: String,
    total_pages_selector: String,
    position: ScrapePosition,
}

impl PageTracker {
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            current_page_selector: site.current_page_selector.clone(),
            total_pages_selector: site.total_pages_selector.clone(),
            position: ScrapePosition::default(),
        }
    }

    pub fn position(&self) -> ScrapePosition {
        self.position
    }

    pub fn current_page(&self) -> u32 {
        self.position.current_page
    }

    pub fn previous_page(&self) -> u32 {
        self.position.previous_page
    }

    pub fn total_pages(&self) -> u32 {
        self.position.total_pages
    }

    /// Re-read the pager. Returns `false` (leaving the position untouched)
    /// when either number cannot be read; the caller decides whether to retry.
    pub async fn refresh<D: PageDriver>(&mut self, driver: &D) -> bool {
        match self.read_pager(driver).await {
            Ok(Some((current, total))) => {
                self.position.current_page = current;
                self.position.total_pages = total;
                true
            }
            Ok(None) => {
                log::debug!("Pager not readable yet (page {})", self.position.current_page);
                false
            }
            Err(e) => {
                log::debug!(
                    "Pager read failed (page {}): {}",
                    self.position.current_page,
                    e
                );
                false
            }
        }
    }

    /// Record the page a navigation attempt starts from.
    pub fn mark_previous(&mut self, page: u32) {
        self.position.previous_page = page;
    }

    /// Whether the last navigation moved the pager forward.
    pub fn advanced(&self) -> bool {
        self.position.current_page > self.position.previous_page
    }

    /// Whether the pager sits on its last page.
    pub fn is_last_page(&self) -> bool {
        self.position.total_pages > 0 && self.position.current_page >= self.position.total_pages
    }

    async fn read_pager<D: PageDriver>(&self, driver: &D) -> Result<Option<(u32, u32)>> {
        // The pager info repeats its numbers in several <strong> tags; the
        // page count is the last numeric one.
        let mut total = None;
        for element in driver.find_all(&self.total_pages_selector).await? {
            if let Some(n) = parse_page_number(&driver.read_text(&element).await?) {
                total = Some(n);
            }
        }

        let mut current = None;
        for element in driver.find_all(&self.current_page_selector).await? {
            if let Some(n) = parse_page_number(&driver.read_text(&element).await?) {
                current = Some(n);
                break;
            }
        }

        Ok(current.zip(total).filter(|(current, _)| *current > 0))
    }
}
