//! Listing crawl: load an infinite-scroll page, scroll until the content stops
//! growing, then read the job headings out of the final DOM.

use std::sync::Arc;
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::extract::ExtractionRules;
use crate::models::ListingBatch;
use crate::traits::{BrowserSession, BrowsingContext, LoadState};
use crate::util::{bounded, navigate_within, require_http_url};

/// Bounds for [`scroll_until_stable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    /// Maximum number of height measurements.
    pub max_iterations: u32,
    /// Pause after each scroll for lazy content to render.
    pub settle: Duration,
    /// Bound on each height read and scroll.
    pub script_timeout: Duration,
}

impl From<&CrawlConfig> for ScrollPolicy {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            max_iterations: config.max_scroll_iterations,
            settle: config.scroll_settle,
            script_timeout: config.script_timeout,
        }
    }
}

/// How a scroll loop ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollReport {
    pub measurements: u32,
    pub scrolls: u32,
    pub final_height: u64,
    /// False when the loop stopped on the iteration cap.
    pub stabilized: bool,
}

/// Scroll to the bottom repeatedly until two consecutive height readings
/// match, or `max_iterations` readings have been taken.
///
/// The height starts at 0, so an empty document stops after one reading.
pub async fn scroll_until_stable<C: BrowsingContext>(
    ctx: &C,
    policy: &ScrollPolicy,
) -> Result<ScrollReport, CrawlError> {
    let mut report = ScrollReport::default();
    let mut previous_height = 0;

    for _ in 0..policy.max_iterations {
        let height = bounded(
            "content height read",
            policy.script_timeout,
            ctx.content_height(),
        )
        .await?;
        report.measurements += 1;
        report.final_height = height;

        if height == previous_height {
            report.stabilized = true;
            break;
        }
        previous_height = height;

        bounded("scroll", policy.script_timeout, ctx.scroll_to_bottom()).await?;
        report.scrolls += 1;
        tracing::debug!(height, scrolls = report.scrolls, "Scrolled to bottom");

        tokio::time::sleep(policy.settle).await;
    }

    Ok(report)
}

/// Crawls a listing page into an ordered list of title/link pairs.
pub struct ListingCrawler<S: BrowserSession> {
    session: S,
    config: Arc<CrawlConfig>,
    rules: Arc<ExtractionRules>,
}

impl<S: BrowserSession> ListingCrawler<S> {
    pub fn new(session: S, config: Arc<CrawlConfig>, rules: Arc<ExtractionRules>) -> Self {
        Self {
            session,
            config,
            rules,
        }
    }

    /// Load `url`, reveal all lazily loaded jobs, and extract them.
    ///
    /// Any failure aborts the whole crawl: a partial listing is never returned.
    #[tracing::instrument(skip_all, fields(crawl_id = %uuid::Uuid::new_v4(), url = %url))]
    pub async fn crawl(&self, url: &str) -> Result<ListingBatch, CrawlError> {
        require_http_url("listing URL", url)?;

        let ctx = self.session.acquire_context().await?;
        let result = self.crawl_in(&ctx, url).await;
        ctx.close().await;

        match &result {
            Ok(batch) => tracing::info!(count = batch.count, "Listing crawl complete"),
            Err(e) => tracing::warn!(error = %e, "Listing crawl failed"),
        }
        result
    }

    async fn crawl_in(&self, ctx: &S::Context, url: &str) -> Result<ListingBatch, CrawlError> {
        tracing::info!("Loading listing page");
        navigate_within(
            ctx,
            url,
            LoadState::DomContentLoaded,
            self.config.listing_timeout,
        )
        .await?;

        let report = scroll_until_stable(ctx, &ScrollPolicy::from(self.config.as_ref())).await?;
        tracing::info!(
            measurements = report.measurements,
            scrolls = report.scrolls,
            height = report.final_height,
            stabilized = report.stabilized,
            "Scrolling finished"
        );

        let snapshot = bounded("snapshot", self.config.script_timeout, ctx.snapshot()).await?;
        tracing::debug!(bytes = snapshot.html.len(), "Captured listing DOM");

        Ok(ListingBatch::from(self.rules.listing_items(&snapshot)))
    }
}
