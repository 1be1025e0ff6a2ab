//! Fixed-delay pacing between detail-page visits.
//!
//! The detail crawl waits for the configured delay between two items,
//! whatever the previous item's outcome.

use std::time::Duration;

use rand::Rng;

/// Configuration for the pause between consecutive detail visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// Base pause between two navigations.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter]).
    ///
    /// Set to `Duration::ZERO` (the default) for a fixed delay.
    pub jitter: Duration,
}

impl PacingConfig {
    /// Create a new config with the given delay and no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// Add random jitter (uniform [0, jitter]) on top of the base delay.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the effective delay for a single pause (delay + random jitter).
    pub fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand::rng().random_range(0..=self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for PacingConfig {
    /// 3 seconds, no jitter.
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

/// Sleeps between detail visits according to a [`PacingConfig`].
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Suspend the calling task for one effective delay.
    pub async fn pause(&self) {
        let delay = self.config.effective_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!(delay_ms = %delay.as_millis(), "Pacing before next detail page");
        tokio::time::sleep(delay).await;
    }
}
