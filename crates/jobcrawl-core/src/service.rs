use std::sync::Arc;

use crate::config::CrawlConfig;
use crate::detail::DetailCrawler;
use crate::error::CrawlError;
use crate::extract::ExtractionRules;
use crate::listing::ListingCrawler;
use crate::models::{DetailBatch, ListingBatch, ListingItem};
use crate::traits::BrowserSession;

/// Entry point for the whole crawl pipeline: listing → details → batch.
///
/// Both crawlers share one browser session and one compiled rule set. The
/// session is generic so tests run the real pipeline against
/// the mock session in `testutil`.
pub struct CrawlService<S: BrowserSession> {
    listing: ListingCrawler<S>,
    details: DetailCrawler<S>,
}

impl<S: BrowserSession> CrawlService<S> {
    /// Compile the extraction rules and wire both crawlers to `session`.
    pub fn new(session: S, config: CrawlConfig) -> Result<Self, CrawlError> {
        let rules = Arc::new(ExtractionRules::new(&config.rules)?);
        let config = Arc::new(config);
        Ok(Self {
            listing: ListingCrawler::new(session.clone(), config.clone(), rules.clone()),
            details: DetailCrawler::new(session, config, rules),
        })
    }

    pub async fn crawl_listing(&self, url: &str) -> Result<ListingBatch, CrawlError> {
        self.listing.crawl(url).await
    }

    pub async fn crawl_details(&self, items: &[ListingItem]) -> Result<DetailBatch, CrawlError> {
        self.details.crawl(items).await
    }

    /// Crawl the listing at `url`, then every job it found.
    pub async fn crawl(&self, url: &str) -> Result<DetailBatch, CrawlError> {
        let listing = self.crawl_listing(url).await?;
        tracing::info!(count = listing.count, "Following listing into detail pages");
        self.crawl_details(&listing.jobs).await
    }
}
