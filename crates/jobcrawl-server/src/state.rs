use jobcrawl_core::CrawlService;
use jobcrawl_core::traits::BrowserSession;

/// Shared application state, available to all route handlers via `State<Arc<AppState<S>>>`.
pub struct AppState<S: BrowserSession> {
    pub service: CrawlService<S>,
    /// Used by `/v1/listing` when the request names no URL.
    pub default_listing_url: Option<String>,
}
