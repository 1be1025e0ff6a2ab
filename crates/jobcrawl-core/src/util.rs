use std::future::Future;
use std::time::Duration;

use crate::error::CrawlError;
use crate::traits::{BrowsingContext, LoadState};

/// Run a page operation under a time bound.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, CrawlError>>,
) -> Result<T, CrawlError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(inner) => inner,
        Err(_) => Err(CrawlError::Timeout { operation, timeout }),
    }
}

/// Navigate and wait for `state`, failing with
/// [`CrawlError::NavigationTimeout`] once `timeout` elapses.
pub(crate) async fn navigate_within<C: BrowsingContext>(
    ctx: &C,
    url: &str,
    state: LoadState,
    timeout: Duration,
) -> Result<(), CrawlError> {
    match tokio::time::timeout(timeout, ctx.navigate(url, state)).await {
        Ok(inner) => inner,
        Err(_) => Err(CrawlError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        }),
    }
}

/// Accept only `http`/`https` URLs; anything else is [`CrawlError::InvalidInput`].
pub(crate) fn require_http_url(what: &str, url: &str) -> Result<(), CrawlError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| CrawlError::InvalidInput(format!("Invalid {what} '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(CrawlError::InvalidInput(format!(
            "URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}
