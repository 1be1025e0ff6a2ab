use std::future::Future;

use crate::error::CrawlError;
use crate::models::PageSnapshot;

/// Document readiness a navigation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The initial HTML is parsed (`DOMContentLoaded`).
    DomContentLoaded,
    /// The document and its subresources finished loading (`load`).
    Load,
}

/// A handle to one shared browser process.
///
/// Implementations launch the process on first use and never tear it down;
/// every crawl asks for its own [`BrowsingContext`].
pub trait BrowserSession: Send + Sync + Clone {
    type Context: BrowsingContext;

    /// Creates a browsing context isolated from every other context
    /// (cookies, storage, history).
    fn acquire_context(&self) -> impl Future<Output = Result<Self::Context, CrawlError>> + Send;
}

/// An isolated page surface inside the shared browser.
///
/// The crawl pipeline wraps every call in its own timeout, so
/// implementations may wait as long as the browser takes.
pub trait BrowsingContext: Send + Sync {
    /// Navigates the page and waits until `state` is reached.
    fn navigate(
        &self,
        url: &str,
        state: LoadState,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// Current scrollable height of the document body, in CSS pixels.
    fn content_height(&self) -> impl Future<Output = Result<u64, CrawlError>> + Send;

    /// Scrolls the window to the bottom of the document.
    fn scroll_to_bottom(&self) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// Captures the rendered DOM together with the URL it came from.
    fn snapshot(&self) -> impl Future<Output = Result<PageSnapshot, CrawlError>> + Send;

    /// Disposes the context. Failures are logged, never returned.
    fn close(self) -> impl Future<Output = ()> + Send;
}
