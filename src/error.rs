// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record log could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any failure reported by the browser driver
    #[error("Browser error: {0}")]
    Browser(String),

    /// A bounded wait expired
    #[error("Timed out after {timeout:?} waiting for {action}")]
    Timeout { action: String, timeout: Duration },

    /// The next-page click fired but the page number never changed
    #[error("Page stalled on page {page}: next-page click did not change the page number")]
    PageStall { page: u32 },

    /// No data table could be found in the page snapshot
    #[error("No table found on page {page} after {attempts} attempts")]
    TableMissing { page: u32, attempts: u32 },

    /// The target page could not be opened at all
    #[error("Failed to open {url} after {attempts} attempts: {message}")]
    OpenFailed {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Jump-to-page gave up before reaching its target
    #[error("Could not reach page {target} (stopped at page {reached} after {attempts} attempts)")]
    JumpExhausted {
        target: u32,
        reached: u32,
        attempts: u32,
    },

    /// Forward navigation kept failing on the same page
    #[error("Navigation from page {page} failed after {attempts} attempts: {message}")]
    NavigationFailed {
        page: u32,
        attempts: u32,
        message: String,
    },

    /// The session was cancelled by the user
    #[error("Interrupted")]
    Interrupted,
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a browser driver error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a timeout error for the named action.
    pub fn timeout(action: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            action: action.into(),
            timeout,
        }
    }

    /// Whether the caller may retry the failed operation.
    ///
    /// Driver hiccups, expired waits, stalls and rendering races are all
    /// transient; everything else ends the session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Browser(_)
                | Self::Timeout { .. }
                | Self::PageStall { .. }
                | Self::TableMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(AppError::browser("stale element").is_retryable());
        assert!(AppError::timeout("page change", Duration::from_secs(1)).is_retryable());
        assert!(AppError::PageStall { page: 4 }.is_retryable());
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        let io = AppError::from(std::io::Error::other("disk full"));
        assert!(!io.is_retryable());
        assert!(
            !AppError::JumpExhausted {
                target: 9,
                reached: 3,
                attempts: 18
            }
            .is_retryable()
        );
        assert!(!AppError::Interrupted.is_retryable());
    }

    #[test]
    fn stall_message_names_the_page() {
        let message = AppError::PageStall { page: 12 }.to_string();
        assert!(message.contains("page 12"));
    }
}
