// src/services/navigator.rs

//! Navigation controller.
//!
//! Drives the grid's "next page" control one verified step at a time:
//!
//! ```text
//! Idle ──locate next──▶ Navigating ──click──▶ Verifying ──page changed──▶ Idle
//!   │                        │                    │
//!   └─ no enabled control    └──── driver error / timeout / stall ───▶ Failed
//!      (NoMorePages)
//! ```
//!
//! [`Navigator::goto_next`] makes exactly one attempt; retrying is up to the
//! caller. [`Navigator::jump_to`] is the one place that loops, and it is
//! bounded.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::PageTracker;
use crate::utils::retry::RetryPolicy;
use crate::utils::wait::Poller;

/// Navigation controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Navigating,
    Verifying,
    Failed,
}

/// Result of one successful `goto_next` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The pager moved forward.
    Advanced { from: u32, to: u32 },
    /// No enabled next control: the grid is on its last page.
    NoMorePages,
}

pub struct Navigator {
    next_button_selector: String,
    wait_timeout: Duration,
    poll_interval: Duration,
    backoff: RetryPolicy,
    jump_attempts_per_page: u32,
    state: NavState,
}

impl Navigator {
    pub fn new(config: &Config) -> Self {
        Self {
            next_button_selector: config.site.next_button_selector.clone(),
            wait_timeout: config.wait.timeout(),
            poll_interval: config.wait.poll_interval(),
            backoff: config.retry.navigation.clone(),
            jump_attempts_per_page: config.retry.jump_attempts_per_page,
            state: NavState::Idle,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Move the pager forward from page `from` and verify that it moved.
    ///
    /// A pager that already shows a later page (a previous click landed after
    /// its wait expired) counts as advanced and is not clicked again.
    pub async fn goto_next<D: PageDriver>(
        &mut self,
        driver: &D,
        tracker: &mut PageTracker,
        from: u32,
    ) -> Result<NavOutcome> {
        self.state = NavState::Navigating;
        let result = self.try_goto_next(driver, tracker, from).await;
        self.state = match &result {
            Ok(_) => NavState::Idle,
            Err(_) => NavState::Failed,
        };
        result
    }

    async fn try_goto_next<D: PageDriver>(
        &mut self,
        driver: &D,
        tracker: &mut PageTracker,
        from: u32,
    ) -> Result<NavOutcome> {
        let readable = tracker.refresh(driver).await;
        tracker.mark_previous(from);
        if readable && tracker.advanced() {
            let to = tracker.current_page();
            log::debug!("Pager already moved from page {} to page {}", from, to);
            return Ok(NavOutcome::Advanced { from, to });
        }

        let Some(next) = self.find_enabled_next(driver).await? else {
            log::debug!("No enabled next control on page {}", from);
            return Ok(NavOutcome::NoMorePages);
        };

        driver.scroll_into_view(&next).await?;
        driver.click(&next).await?;

        self.state = NavState::Verifying;
        let mut poller = Poller::new(self.wait_timeout, self.poll_interval);
        let mut readable = false;
        loop {
            if tracker.refresh(driver).await {
                readable = true;
                if tracker.advanced() {
                    break;
                }
            }
            if !poller.tick().await {
                // A pager that kept reporting the same page means the click
                // landed but did nothing; an unreadable one is just slow.
                return Err(if readable {
                    AppError::PageStall { page: from }
                } else {
                    AppError::timeout(format!("page change from page {from}"), poller.timeout())
                });
            }
        }

        tracker.refresh(driver).await;
        let to = tracker.current_page();
        if to == from {
            return Err(AppError::PageStall { page: from });
        }
        log::debug!("Advanced from page {} to page {}", from, to);
        Ok(NavOutcome::Advanced { from, to })
    }

    /// The last element matching the next selector that is not disabled.
    async fn find_enabled_next<D: PageDriver>(&self, driver: &D) -> Result<Option<D::Element>> {
        let mut found = None;
        for element in driver.find_all(&self.next_button_selector).await? {
            if is_enabled(driver, &element).await? {
                found = Some(element);
            }
        }
        Ok(found)
    }

    /// Advance until the pager reaches `target`.
    ///
    /// Failed attempts are retried with backoff, within a budget proportional
    /// to the distance still to cover. Running out of budget, or out of pages,
    /// is fatal for the session.
    pub async fn jump_to<D: PageDriver>(
        &mut self,
        driver: &D,
        tracker: &mut PageTracker,
        target: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tracker.refresh(driver).await;
        let start = tracker.current_page();
        let max_attempts = target
            .saturating_sub(start)
            .saturating_mul(self.jump_attempts_per_page)
            .saturating_add(1);
        let mut attempts = 0;
        let mut consecutive_failures = 0;
        // Last page the pager was confirmed on; a retry must start from here
        // so a late page change is not clicked past.
        let mut at = start;

        log::info!("Jumping from page {} to page {}", start, target);

        while tracker.current_page() < target {
            if cancel.is_cancelled() {
                return Err(AppError::Interrupted);
            }
            if attempts >= max_attempts {
                return Err(AppError::JumpExhausted {
                    target,
                    reached: tracker.current_page(),
                    attempts,
                });
            }
            attempts += 1;

            match self.goto_next(driver, tracker, at).await {
                Ok(NavOutcome::Advanced { to, .. }) => {
                    consecutive_failures = 0;
                    at = to;
                    log::debug!("Jump progress: page {}/{}", to, target);
                }
                Ok(NavOutcome::NoMorePages) => {
                    return Err(AppError::JumpExhausted {
                        target,
                        reached: tracker.current_page(),
                        attempts,
                    });
                }
                Err(e) if e.is_retryable() => {
                    consecutive_failures += 1;
                    let delay = self.backoff.delay_for(consecutive_failures);
                    log::warn!(
                        "Jump step from page {} failed: {}. Retrying in {:?}",
                        at,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        log::info!("Reached page {}", tracker.current_page());
        Ok(())
    }
}

async fn is_enabled<D: PageDriver>(driver: &D, element: &D::Element) -> Result<bool> {
    if driver.read_attribute(element, "disabled").await?.is_some() {
        return Ok(false);
    }
    if driver
        .read_attribute(element, "aria-disabled")
        .await?
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return Ok(false);
    }
    let class = driver.read_attribute(element, "class").await?;
    Ok(!class.is_some_and(|c| c.contains("Disabled")))
}
