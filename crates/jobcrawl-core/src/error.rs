use std::time::Duration;

use thiserror::Error;

/// Error types for the crawl pipeline.
///
/// Blocked pages are not errors (see [`crate::DetailOutcome`]), and selectors
/// that match nothing degrade to empty fields.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The shared browser process could not be started (or has died).
    #[error("Browser launch failed: {0}")]
    LaunchFailure(String),

    /// A fresh browsing context could not be created on a live browser.
    #[error("Browser context error: {0}")]
    ContextError(String),

    /// A navigation did not reach the requested load state in time.
    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// Network, DNS, or protocol failure while navigating.
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// A detail item carried no link to visit.
    #[error("No link to follow for '{0}'")]
    MissingLink(String),

    /// A bounded page operation (height read, scroll, snapshot) expired.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// In-page script evaluation failed or returned an unexpected value.
    #[error("Script error: {0}")]
    ScriptError(String),

    /// Caller supplied structurally invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad configuration value or extraction selector.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CrawlError {
    /// Returns true if this error blocks every crawl, not just the current one.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::LaunchFailure(_))
    }

    /// Returns true for the bounded-wait failures.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CrawlError::NavigationTimeout { .. } | CrawlError::Timeout { .. }
        )
    }
}
