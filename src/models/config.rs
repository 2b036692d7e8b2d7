//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::retry::RetryPolicy;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Headless browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Target page and the selectors used to read it
    #[serde(default)]
    pub site: SiteConfig,

    /// Polling and pacing
    #[serde(default)]
    pub wait: WaitConfig,

    /// Retry budgets for the unreliable parts of the page
    #[serde(default)]
    pub retry: RetryConfig,

    /// Record log location
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.site.url)?;

        let selectors = [
            ("site.table_selector", &self.site.table_selector),
            ("site.next_button_selector", &self.site.next_button_selector),
            ("site.current_page_selector", &self.site.current_page_selector),
            ("site.total_pages_selector", &self.site.total_pages_selector),
        ];
        for (name, selector) in selectors {
            if selector.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector.as_str(), format!("{e:?}")))?;
        }

        if self.browser.page_load_timeout_secs == 0 {
            return Err(AppError::validation(
                "browser.page_load_timeout_secs must be > 0",
            ));
        }
        if self.wait.timeout_secs == 0 {
            return Err(AppError::validation("wait.timeout_secs must be > 0"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(AppError::validation("wait.poll_interval_ms must be > 0"));
        }
        for (name, policy) in [
            ("retry.open", &self.retry.open),
            ("retry.navigation", &self.retry.navigation),
            ("retry.table", &self.retry.table),
        ] {
            if policy.max_attempts == 0 {
                return Err(AppError::validation(format!(
                    "{name}.max_attempts must be > 0"
                )));
            }
        }
        if self.retry.jump_attempts_per_page == 0 {
            return Err(AppError::validation(
                "retry.jump_attempts_per_page must be > 0",
            ));
        }
        if self.output.file.trim().is_empty() {
            return Err(AppError::validation("output.file is empty"));
        }
        Ok(())
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chromium without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Explicit Chromium/Chrome binary; autodetected when unset
    #[serde(default)]
    pub executable: Option<String>,

    /// Upper bound for the initial page load in seconds
    #[serde(default = "defaults::page_load_timeout")]
    pub page_load_timeout_secs: u64,
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: defaults::headless(),
            executable: None,
            page_load_timeout_secs: defaults::page_load_timeout(),
        }
    }
}

/// Target page and the CSS selectors that describe its grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Payments page URL
    #[serde(default = "defaults::site_url")]
    pub url: String,

    /// The payments grid (first match is used)
    #[serde(default = "defaults::table_selector")]
    pub table_selector: String,

    /// Pager "next" control (last enabled match is used)
    #[serde(default = "defaults::next_button_selector")]
    pub next_button_selector: String,

    /// Element holding the active page number (first numeric match)
    #[serde(default = "defaults::current_page_selector")]
    pub current_page_selector: String,

    /// Element(s) holding the page count (last numeric match)
    #[serde(default = "defaults::total_pages_selector")]
    pub total_pages_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: defaults::site_url(),
            table_selector: defaults::table_selector(),
            next_button_selector: defaults::next_button_selector(),
            current_page_selector: defaults::current_page_selector(),
            total_pages_selector: defaults::total_pages_selector(),
        }
    }
}

/// Polling and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Bound for every wait on the live page, in seconds
    #[serde(default = "defaults::wait_timeout")]
    pub timeout_secs: u64,

    /// Poll interval while waiting, in milliseconds
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause before taking a page snapshot, in milliseconds
    #[serde(default = "defaults::settle_delay")]
    pub settle_delay_ms: u64,

    /// Pause between finishing a page and clicking next, in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::wait_timeout(),
            poll_interval_ms: defaults::poll_interval(),
            settle_delay_ms: defaults::settle_delay(),
            page_delay_ms: defaults::page_delay(),
        }
    }
}

/// Retry budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Opening the payments page
    #[serde(
        default = "defaults::open_policy",
        deserialize_with = "defaults::open_section"
    )]
    pub open: RetryPolicy,

    /// Advancing past one page
    #[serde(
        default = "defaults::navigation_policy",
        deserialize_with = "defaults::navigation_section"
    )]
    pub navigation: RetryPolicy,

    /// Finding the grid in a snapshot
    #[serde(
        default = "defaults::table_policy",
        deserialize_with = "defaults::table_section"
    )]
    pub table: RetryPolicy,

    /// Jump-to-page budget per page of distance
    #[serde(default = "defaults::jump_attempts_per_page")]
    pub jump_attempts_per_page: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            open: defaults::open_policy(),
            navigation: defaults::navigation_policy(),
            table: defaults::table_policy(),
            jump_attempts_per_page: defaults::jump_attempts_per_page(),
        }
    }
}

/// Record log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV file the records are appended to
    #[serde(default = "defaults::output_file")]
    pub file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: defaults::output_file(),
        }
    }
}

/// Append `.csv` unless the name already ends with it.
pub fn ensure_csv_suffix(name: &str) -> String {
    if name.ends_with(".csv") {
        name.to_string()
    } else {
        format!("{name}.csv")
    }
}

mod defaults {
    use serde::{Deserialize, Deserializer};

    use crate::utils::retry::{RetryOverrides, RetryPolicy};

    // Browser defaults
    pub fn headless() -> bool {
        true
    }
    pub fn page_load_timeout() -> u64 {
        700
    }

    // Site defaults (Telerik RadGrid pager)
    pub fn site_url() -> String {
        "https://www.nhis.gov.gh/payments".into()
    }
    pub fn table_selector() -> String {
        "table".into()
    }
    pub fn next_button_selector() -> String {
        "button.rgPageNext, input.rgPageNext".into()
    }
    pub fn current_page_selector() -> String {
        ".rgCurrentPage".into()
    }
    pub fn total_pages_selector() -> String {
        ".rgInfoPart strong".into()
    }

    // Wait defaults
    pub fn wait_timeout() -> u64 {
        30
    }
    pub fn poll_interval() -> u64 {
        250
    }
    pub fn settle_delay() -> u64 {
        2000
    }
    pub fn page_delay() -> u64 {
        3000
    }

    // Retry defaults
    pub fn open_policy() -> RetryPolicy {
        RetryPolicy::new(20, 5_000, 60_000)
    }
    pub fn navigation_policy() -> RetryPolicy {
        RetryPolicy::new(5, 2_000, 30_000)
    }
    pub fn table_policy() -> RetryPolicy {
        RetryPolicy::new(10, 2_000, 10_000)
    }
    pub fn jump_attempts_per_page() -> u32 {
        3
    }

    // A partial [retry.*] table overrides only the keys it sets
    pub fn open_section<'de, D: Deserializer<'de>>(d: D) -> Result<RetryPolicy, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply_to(open_policy()))
    }
    pub fn navigation_section<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<RetryPolicy, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply_to(navigation_policy()))
    }
    pub fn table_section<'de, D: Deserializer<'de>>(d: D) -> Result<RetryPolicy, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply_to(table_policy()))
    }

    // Output defaults
    pub fn output_file() -> String {
        "nhis_payments.csv".into()
    }
}
