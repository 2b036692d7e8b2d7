// src/pipeline/session.rs

//! Crawl session orchestrator.
//!
//! One session walks the grid from its resume point to the last page:
//!
//! ```text
//! Starting ──resume page 0──────────────────▶ ScrapeAdvance ◀─┐
//!    │                                            │   │         │ advanced
//!    └──resume page N──▶ Jumping { N } ───────────┘   └─────────┘
//!                                                      │
//!                                       last page / no next control
//!                                                      ▼
//!                                                     Done
//! ```
//!
//! Any state moves to `Interrupted` once the cancellation token fires. Every
//! exit path flushes pending records and closes the browser.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::{Config, Record};
use crate::services::{NavOutcome, Navigator, PageScraper, PageTracker};
use crate::storage::{RecordLog, RecordStore};
use crate::utils::retry::{RetryPolicy, retry_async};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Jumping { target: u32 },
    ScrapeAdvance,
    Interrupted,
    Done,
}

/// Outcome of a session that ended without a fatal error.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub pages_scraped: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub final_state: SessionState,
    /// Page the grid was on when the session ended
    pub last_page: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub struct Session<D: PageDriver, L: RecordLog> {
    driver: D,
    store: RecordStore<L>,
    tracker: PageTracker,
    navigator: Navigator,
    scraper: PageScraper,
    pending: VecDeque<Record>,
    cancel: CancellationToken,
    state: SessionState,

    url: String,
    open_timeout: Duration,
    open_policy: RetryPolicy,
    navigation_policy: RetryPolicy,
    page_delay: Duration,

    pages_scraped: usize,
    appended: usize,
    duplicates: usize,
}

impl<D: PageDriver, L: RecordLog> Session<D, L> {
    pub fn new(
        config: &Config,
        driver: D,
        store: RecordStore<L>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            driver,
            store,
            tracker: PageTracker::new(&config.site),
            navigator: Navigator::new(config),
            scraper: PageScraper::new(config)?,
            pending: VecDeque::new(),
            cancel,
            state: SessionState::Starting,
            url: config.site.url.clone(),
            open_timeout: config.browser.page_load_timeout(),
            open_policy: config.retry.open.clone(),
            navigation_policy: config.retry.navigation.clone(),
            page_delay: config.wait.page_delay(),
            pages_scraped: 0,
            appended: 0,
            duplicates: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn store(&self) -> &RecordStore<L> {
        &self.store
    }

    /// Drive the session to completion, interruption or a fatal error.
    ///
    /// Pending records are flushed and the browser is closed on every path.
    /// Interruption is not an error: the report's `final_state` says so.
    pub async fn run(&mut self) -> Result<SessionReport> {
        let start_time = Utc::now();
        let result = self.drive().await;

        let flushed = self.flush();
        if let Err(e) = self.driver.close().await {
            log::warn!("Failed to close browser: {}", e);
        }

        match (result, flushed) {
            (Err(e), flushed) => {
                if let Err(flush_error) = flushed {
                    log::error!("Final flush failed: {}", flush_error);
                }
                log::error!("Session stopped in state {:?}: {}", self.state, e);
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(SessionReport {
                pages_scraped: self.pages_scraped,
                appended: self.appended,
                duplicates: self.duplicates,
                final_state: self.state,
                last_page: self.tracker.current_page(),
                start_time,
                end_time: Utc::now(),
            }),
        }
    }

    async fn drive(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() && self.state != SessionState::Done {
                self.state = SessionState::Interrupted;
            }

            let step = match self.state {
                SessionState::Starting => self.start().await,
                SessionState::Jumping { target } => self.jump(target).await,
                SessionState::ScrapeAdvance => self.scrape_and_advance().await,
                SessionState::Interrupted => {
                    log::warn!(
                        "Interrupted on page {}; saving progress",
                        self.tracker.current_page()
                    );
                    return Ok(());
                }
                SessionState::Done => {
                    log::info!("Reached the last page ({})", self.tracker.current_page());
                    return Ok(());
                }
            };

            match step {
                Ok(()) => {}
                Err(AppError::Interrupted) => self.state = SessionState::Interrupted,
                Err(e) => return Err(e),
            }
        }
    }

    async fn start(&mut self) -> Result<()> {
        let url = self.url.as_str();
        let timeout = self.open_timeout;
        let driver = &self.driver;
        let policy = &self.open_policy;

        until_cancelled(&self.cancel, async move {
            retry_async(policy, &format!("Opening {url}"), move |_| {
                driver.open(url, timeout)
            })
            .await
            .map_err(|(e, attempts)| AppError::OpenFailed {
                url: url.to_string(),
                attempts,
                message: e.to_string(),
            })
        })
        .await?;

        self.tracker.refresh(&self.driver).await;
        log::info!(
            "Opened {} (page {} of {})",
            self.url,
            self.tracker.current_page(),
            self.tracker.total_pages()
        );

        let resume_page = self.store.resume_page();
        self.state = if resume_page == 0 {
            SessionState::ScrapeAdvance
        } else {
            log::info!("Resuming from last recorded page {}", resume_page);
            SessionState::Jumping {
                target: resume_page,
            }
        };
        Ok(())
    }

    async fn jump(&mut self, target: u32) -> Result<()> {
        until_cancelled(
            &self.cancel,
            self.navigator
                .jump_to(&self.driver, &mut self.tracker, target, &self.cancel),
        )
        .await?;
        self.state = SessionState::ScrapeAdvance;
        Ok(())
    }

    async fn scrape_and_advance(&mut self) -> Result<()> {
        let records = until_cancelled(
            &self.cancel,
            self.scraper
                .scrape_current_page(&self.driver, &mut self.tracker),
        )
        .await?;
        self.pages_scraped += 1;
        let found = records.len();
        self.pending.extend(records);
        if self.cancel.is_cancelled() {
            return Err(AppError::Interrupted);
        }

        let (appended, duplicates) = (self.appended, self.duplicates);
        self.flush()?;
        log::info!(
            "Page {}/{}: {} rows, {} new, {} already recorded",
            self.tracker.current_page(),
            self.tracker.total_pages(),
            found,
            self.appended - appended,
            self.duplicates - duplicates
        );
        if self.cancel.is_cancelled() {
            return Err(AppError::Interrupted);
        }

        if self.tracker.is_last_page() {
            self.state = SessionState::Done;
            return Ok(());
        }
        self.advance().await
    }

    /// Move past the page just scraped, retrying failed attempts with backoff.
    ///
    /// Every attempt starts from the scraped page, so a click that lands after
    /// its wait expired is picked up by the retry instead of being clicked past.
    async fn advance(&mut self) -> Result<()> {
        let from = self.tracker.current_page();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = until_cancelled(
                &self.cancel,
                self.navigator
                    .goto_next(&self.driver, &mut self.tracker, from),
            )
            .await;

            match result {
                Ok(NavOutcome::Advanced { .. }) => {
                    if !self.page_delay.is_zero() {
                        sleep_unless_cancelled(&self.cancel, self.page_delay).await?;
                    }
                    return Ok(());
                }
                Ok(NavOutcome::NoMorePages) => {
                    self.state = SessionState::Done;
                    return Ok(());
                }
                Err(e) if e.is_retryable() && self.navigation_policy.allows_another(attempt) => {
                    let delay = self.navigation_policy.delay_for(attempt);
                    log::warn!(
                        "Navigation from page {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        from,
                        attempt,
                        self.navigation_policy.max_attempts,
                        e,
                        delay
                    );
                    sleep_unless_cancelled(&self.cancel, delay).await?;
                }
                Err(e) if e.is_retryable() => {
                    return Err(AppError::NavigationFailed {
                        page: from,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let summary = self.store.flush(&mut self.pending)?;
        self.appended += summary.appended;
        self.duplicates += summary.duplicates;
        Ok(())
    }
}

/// Run `fut` unless `cancel` fires first, in which case the future is dropped
/// and `AppError::Interrupted` is returned.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Interrupted),
        result = fut => result,
    }
}

async fn sleep_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    until_cancelled(cancel, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}
