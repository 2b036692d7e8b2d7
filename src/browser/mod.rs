//! Browser automation boundary.
//!
//! The crawler core only talks to the live page through [`PageDriver`], so the
//! tracker, navigator, scraper and session can run against a scripted fake in
//! tests and against headless Chromium in production.

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use chromium::ChromiumDriver;

/// Browser actions the crawler needs.
///
/// Every method may fail with [`AppError::Browser`](crate::error::AppError);
/// callers treat those failures as retryable.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to a DOM element found by [`find_all`](PageDriver::find_all).
    type Element: Send + Sync;

    /// Navigate to `url`, giving up after `timeout`.
    async fn open(&self, url: &str, timeout: Duration) -> Result<()>;

    /// All elements currently matching a CSS selector, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Rendered text of an element.
    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    /// Attribute value, `None` when absent.
    async fn read_attribute(&self, element: &Self::Element, name: &str)
    -> Result<Option<String>>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Serialized markup of the whole page as currently rendered.
    async fn page_source(&self) -> Result<String>;

    /// Release the browser session.
    async fn close(&self) -> Result<()>;
}
