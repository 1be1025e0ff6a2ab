//! Test utilities: an in-memory browser behind the session traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! State is shared through `Arc<Mutex<_>>`, so a test keeps a clone of the
//! [`MockSession`] and asserts on what the crawl did to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::CrawlError;
use crate::models::PageSnapshot;
use crate::traits::{BrowserSession, BrowsingContext, LoadState};

/// What navigating to a URL does.
#[derive(Debug, Clone)]
pub enum MockPage {
    /// Loads and renders this document.
    Html(String),
    /// Navigation fails with [`CrawlError::NavigationError`] and this message.
    Error(String),
    /// Navigation never completes.
    Hang,
}

/// Sequence of values returned by successive height reads.
#[derive(Debug, Clone)]
pub enum HeightScript {
    /// Each read returns the next value; the last one repeats once exhausted.
    Sequence(Vec<u64>),
    /// Every read grows by `step`, so the page never stabilizes.
    Growing { start: u64, step: u64 },
}

impl HeightScript {
    fn height_at(&self, read: usize) -> u64 {
        match self {
            HeightScript::Sequence(heights) => heights
                .get(read)
                .or_else(|| heights.last())
                .copied()
                .unwrap_or(0),
            HeightScript::Growing { start, step } => start + step * read as u64,
        }
    }
}

/// Everything the crawl did to the mock browser.
#[derive(Debug, Default, Clone)]
pub struct MockRecord {
    pub navigations: Vec<(String, LoadState)>,
    pub height_reads: usize,
    pub scrolls: usize,
    pub acquired: usize,
    pub closed: usize,
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// Mock browser session serving canned pages.
#[derive(Clone)]
pub struct MockSession {
    pages: Arc<Mutex<HashMap<String, MockPage>>>,
    heights: Arc<Mutex<HeightScript>>,
    launch_error: Arc<Mutex<Option<String>>>,
    record: Arc<Mutex<MockRecord>>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    /// A session with no pages and a flat height of 1000.
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            heights: Arc::new(Mutex::new(HeightScript::Sequence(vec![1000]))),
            launch_error: Arc::new(Mutex::new(None)),
            record: Arc::new(Mutex::new(MockRecord::default())),
        }
    }

    /// A session whose browser never starts.
    pub fn failing_launch(message: &str) -> Self {
        let session = Self::new();
        *session.launch_error.lock().unwrap() = Some(message.to_string());
        session
    }

    pub fn with_page(self, url: &str, page: MockPage) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_page(url, MockPage::Html(html.to_string()))
    }

    pub fn with_heights(self, heights: Vec<u64>) -> Self {
        *self.heights.lock().unwrap() = HeightScript::Sequence(heights);
        self
    }

    pub fn with_growing_height(self, start: u64, step: u64) -> Self {
        *self.heights.lock().unwrap() = HeightScript::Growing { start, step };
        self
    }

    /// Snapshot of everything recorded so far.
    pub fn record(&self) -> MockRecord {
        self.record.lock().unwrap().clone()
    }

    /// URLs navigated to, in order.
    pub fn navigated_urls(&self) -> Vec<String> {
        self.record()
            .navigations
            .into_iter()
            .map(|(url, _)| url)
            .collect()
    }
}

impl BrowserSession for MockSession {
    type Context = MockContext;

    async fn acquire_context(&self) -> Result<MockContext, CrawlError> {
        if let Some(message) = self.launch_error.lock().unwrap().clone() {
            return Err(CrawlError::LaunchFailure(message));
        }
        self.record.lock().unwrap().acquired += 1;
        Ok(MockContext {
            session: self.clone(),
            current: Arc::new(Mutex::new(None)),
        })
    }
}

// ---------------------------------------------------------------------------
// MockContext
// ---------------------------------------------------------------------------

/// Mock browsing context; `current` is the URL of the loaded document.
pub struct MockContext {
    session: MockSession,
    current: Arc<Mutex<Option<String>>>,
}

impl BrowsingContext for MockContext {
    async fn navigate(&self, url: &str, state: LoadState) -> Result<(), CrawlError> {
        let page = {
            let mut record = self.session.record.lock().unwrap();
            record.navigations.push((url.to_string(), state));
            self.session.pages.lock().unwrap().get(url).cloned()
        };

        match page {
            Some(MockPage::Html(_)) => {
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
            Some(MockPage::Error(message)) => Err(CrawlError::NavigationError(message)),
            Some(MockPage::Hang) => std::future::pending().await,
            None => Err(CrawlError::NavigationError(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            ))),
        }
    }

    async fn content_height(&self) -> Result<u64, CrawlError> {
        let read = {
            let mut record = self.session.record.lock().unwrap();
            record.height_reads += 1;
            record.height_reads - 1
        };
        Ok(self.session.heights.lock().unwrap().height_at(read))
    }

    async fn scroll_to_bottom(&self) -> Result<(), CrawlError> {
        self.session.record.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn snapshot(&self) -> Result<PageSnapshot, CrawlError> {
        let current = self.current.lock().unwrap().clone();
        let Some(url) = current else {
            return Err(CrawlError::ScriptError("no document loaded".into()));
        };
        match self.session.pages.lock().unwrap().get(&url) {
            Some(MockPage::Html(html)) => Ok(PageSnapshot {
                url,
                html: html.clone(),
            }),
            _ => Err(CrawlError::ScriptError(format!("no document for {url}"))),
        }
    }

    async fn close(self) {
        self.session.record.lock().unwrap().closed += 1;
    }
}
