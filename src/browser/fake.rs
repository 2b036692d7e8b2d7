//! Scripted in-memory grid used by the unit tests.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::SiteConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeElement {
    Next { enabled: bool },
    CurrentPage,
    TotalPages,
}

/// Mutable script of the fake grid. Counters prefixed with a verb are
/// consumed one unit per matching call.
#[derive(Default)]
pub(crate) struct FakeSite {
    pub pages: Vec<Vec<Vec<String>>>,
    pub current: u32,
    pub stall_clicks: u32,
    pub fail_clicks: u32,
    pub fail_opens: u32,
    pub missing_tables: u32,
    pub unreadable_reads: u32,
    /// Reads of the current-page element that still show the old number
    /// after a click
    pub lag_reads: u32,
    /// Wall-clock delay between a click and the page change it causes
    pub click_delay: Option<Duration>,
    pub cancel_on_page: Option<(u32, CancellationToken)>,
    pub clicks: u32,
    pub opened: bool,
    pub closed: bool,
    pending_advance: Option<u32>,
    advance_at: Option<Instant>,
}

impl FakeSite {
    fn total(&self) -> u32 {
        self.pages.len() as u32
    }

    fn settle(&mut self) {
        if self.advance_at.is_some_and(|at| Instant::now() >= at) {
            self.current += 1;
            self.advance_at = None;
        }
        if let Some(remaining) = self.pending_advance {
            if remaining == 0 {
                self.current += 1;
                self.pending_advance = None;
            } else {
                self.pending_advance = Some(remaining - 1);
            }
        }
    }
}

pub(crate) struct FakeDriver {
    site: Mutex<FakeSite>,
    selectors: SiteConfig,
}

impl FakeDriver {
    /// A grid showing the given pages, positioned on page 1.
    pub fn new(pages: Vec<Vec<Vec<String>>>) -> Self {
        Self {
            site: Mutex::new(FakeSite {
                pages,
                current: 1,
                ..FakeSite::default()
            }),
            selectors: SiteConfig::default(),
        }
    }

    /// `page_count` pages of `rows_per_page` distinct, well-formed rows.
    pub fn with_pages(page_count: u32, rows_per_page: usize) -> Self {
        Self::new(
            (1..=page_count)
                .map(|page| payment_rows(page, rows_per_page))
                .collect(),
        )
    }

    pub fn site(&self) -> MutexGuard<'_, FakeSite> {
        self.site.lock().unwrap()
    }
}

/// Distinct well-formed payment rows for one page.
pub(crate) fn payment_rows(page: u32, count: usize) -> Vec<Vec<String>> {
    (0..count)
        .map(|i| {
            vec![
                format!("Facility{page}x{i} Clinic"),
                "Accra Metro".to_string(),
                format!("{}.50", 100 + i),
                "Dec.24".to_string(),
                "15/01/2025".to_string(),
            ]
        })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render(rows: &[Vec<String>], current: u32, total: u32) -> String {
    let mut html = String::from(
        "<html><body><table class=\"rgMasterTable\">\
         <tr><th>Facility</th><th>District</th><th>Amount</th><th>Claim Month</th><th>Payment Date</th></tr>",
    );
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td> {} </td>", escape(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str(&format!(
        "<tr class=\"rgPager\"><td>Page {current} of {total}</td></tr></table></body></html>"
    ));
    html
}

#[async_trait]
impl PageDriver for FakeDriver {
    type Element = FakeElement;

    async fn open(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut site = self.site();
        if site.fail_opens > 0 {
            site.fail_opens -= 1;
            return Err(AppError::browser(format!("connection reset loading {url}")));
        }
        site.opened = true;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<FakeElement>> {
        let mut site = self.site();
        if selector == self.selectors.next_button_selector {
            let enabled = site.current < site.total();
            Ok(vec![FakeElement::Next { enabled }])
        } else if selector == self.selectors.current_page_selector {
            if site.unreadable_reads > 0 {
                site.unreadable_reads -= 1;
                return Ok(Vec::new());
            }
            Ok(vec![FakeElement::CurrentPage])
        } else if selector == self.selectors.total_pages_selector {
            Ok(vec![FakeElement::TotalPages])
        } else {
            Err(AppError::browser(format!("unexpected selector {selector}")))
        }
    }

    async fn read_text(&self, element: &FakeElement) -> Result<String> {
        let mut site = self.site();
        match element {
            FakeElement::CurrentPage => {
                site.settle();
                Ok(site.current.to_string())
            }
            FakeElement::TotalPages => Ok(site.total().to_string()),
            FakeElement::Next { .. } => Ok(String::new()),
        }
    }

    async fn read_attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        match (element, name) {
            (FakeElement::Next { enabled: false }, "disabled") => Ok(Some("disabled".into())),
            (FakeElement::Next { .. }, "class") => Ok(Some("rgPageNext".into())),
            _ => Ok(None),
        }
    }

    async fn scroll_into_view(&self, _element: &FakeElement) -> Result<()> {
        Ok(())
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let mut site = self.site();
        site.clicks += 1;
        if site.fail_clicks > 0 {
            site.fail_clicks -= 1;
            return Err(AppError::browser("stale element reference"));
        }
        if site.stall_clicks > 0 {
            site.stall_clicks -= 1;
            return Ok(());
        }
        let idle = site.pending_advance.is_none() && site.advance_at.is_none();
        if matches!(element, FakeElement::Next { enabled: true }) && idle {
            match site.click_delay {
                Some(delay) => site.advance_at = Some(Instant::now() + delay),
                None => site.pending_advance = Some(site.lag_reads),
            }
        }
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        let mut site = self.site();
        site.settle();
        if let Some((page, token)) = &site.cancel_on_page {
            if *page == site.current {
                token.cancel();
            }
        }
        if site.missing_tables > 0 {
            site.missing_tables -= 1;
            return Ok("<html><body><div class=\"loading\">Loading...</div></body></html>".into());
        }
        let index = site.current.saturating_sub(1) as usize;
        let rows = site.pages.get(index).cloned().unwrap_or_default();
        Ok(render(&rows, site.current, site.total()))
    }

    async fn close(&self) -> Result<()> {
        self.site().closed = true;
        Ok(())
    }
}
