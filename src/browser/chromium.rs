//! Headless Chromium driver.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;

// The grid's pager buttons are often covered by overlays, so clicks and
// scrolls are dispatched from script rather than synthesized mouse events.
const SCROLL_INTO_VIEW_JS: &str = "function() { this.scrollIntoView({block: 'center'}); }";
const CLICK_JS: &str = "function() { this.click(); }";

impl From<CdpError> for AppError {
    fn from(e: CdpError) -> Self {
        AppError::browser(e)
    }
}

/// One Chromium process with a single tab.
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank tab.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .no_sandbox()
            .request_timeout(config.page_load_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(AppError::browser)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await?;

        // Drive the CDP connection
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        log::debug!(
            "Chromium launched ({})",
            if config.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Element = Element;

    async fn open(&self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| AppError::timeout(format!("page load of {url}"), timeout))??;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.page.find_elements(selector).await?)
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<()> {
        element.call_js_fn(SCROLL_INTO_VIEW_JS, false).await?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.call_js_fn(CLICK_JS, false).await?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        if let Err(e) = browser.wait().await {
            log::debug!("Chromium did not exit cleanly: {}", e);
        }
        self.handler.abort();
        log::info!("Browser session closed");
        Ok(())
    }
}
