//! Detail crawl: visit each listing item's page one at a time, recognise
//! challenge pages, extract the rest, and record a result for every item.
//!
//! Visits are strictly sequential and paced, one context per batch.

use std::sync::Arc;

use scraper::Html;
use url::Url;

use crate::aggregate::ResultAggregator;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::extract::{ExtractionRules, collapse_whitespace, visible_text};
use crate::models::{DetailBatch, DetailOutcome, JobDetail, ListingItem, PageSnapshot};
use crate::pacing::Pacer;
use crate::traits::{BrowserSession, BrowsingContext, LoadState};
use crate::util::{bounded, navigate_within, require_http_url};

/// Recognises anti-bot challenge pages by their visible text.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    markers: Vec<String>,
}

impl BlockDetector {
    pub fn new(markers: &[String]) -> Self {
        Self {
            markers: markers
                .iter()
                .map(|m| collapse_whitespace(m))
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// The first marker found in the document's visible text, if any.
    pub fn detect(&self, doc: &Html) -> Option<&str> {
        if self.markers.is_empty() {
            return None;
        }
        let text = visible_text(doc);
        self.markers
            .iter()
            .find(|marker| text.contains(marker.as_str()))
            .map(String::as_str)
    }
}

enum PageVerdict {
    Blocked(String),
    Loaded(JobDetail),
}

/// Crawls detail pages for a batch of listing items.
pub struct DetailCrawler<S: BrowserSession> {
    session: S,
    config: Arc<CrawlConfig>,
    rules: Arc<ExtractionRules>,
    blocks: BlockDetector,
    pacer: Pacer,
}

impl<S: BrowserSession> DetailCrawler<S> {
    pub fn new(session: S, config: Arc<CrawlConfig>, rules: Arc<ExtractionRules>) -> Self {
        Self {
            blocks: BlockDetector::new(&config.block_markers),
            pacer: Pacer::new(config.pacing.clone()),
            session,
            config,
            rules,
        }
    }

    /// Visit every item in order and return one outcome per item.
    ///
    /// Per-item problems (timeouts, network errors, challenge pages, missing
    /// links) become `Failed`/`Blocked` entries. Only a browser that cannot be
    /// reached at all fails the whole call.
    #[tracing::instrument(skip_all, fields(crawl_id = %uuid::Uuid::new_v4(), items = items.len()))]
    pub async fn crawl(&self, items: &[ListingItem]) -> Result<DetailBatch, CrawlError> {
        if items.is_empty() {
            return Ok(ResultAggregator::default().finish());
        }

        let ctx = self.session.acquire_context().await?;
        let aggregator = self.crawl_in(&ctx, items).await;
        ctx.close().await;

        let tally = aggregator.tally();
        tracing::info!(
            detail = tally.detail,
            blocked = tally.blocked,
            failed = tally.failed,
            "Detail crawl complete"
        );
        Ok(aggregator.finish())
    }

    async fn crawl_in(&self, ctx: &S::Context, items: &[ListingItem]) -> ResultAggregator {
        let mut aggregator = ResultAggregator::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.pacer.pause().await;
            }
            aggregator.record(self.visit(ctx, item).await);
        }

        aggregator
    }

    async fn visit(&self, ctx: &S::Context, item: &ListingItem) -> DetailOutcome {
        match self.load(ctx, item).await {
            Ok(PageVerdict::Loaded(detail)) => {
                tracing::info!(title = %item.title, sections = detail.sections.len(), "Extracted detail page");
                DetailOutcome::Detail {
                    item: item.clone(),
                    detail,
                }
            }
            Ok(PageVerdict::Blocked(marker)) => {
                tracing::warn!(title = %item.title, %marker, "Challenge page detected");
                DetailOutcome::Blocked { item: item.clone() }
            }
            Err(e) => {
                tracing::warn!(title = %item.title, error = %e, "Detail page failed");
                DetailOutcome::Failed {
                    item: item.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn load(&self, ctx: &S::Context, item: &ListingItem) -> Result<PageVerdict, CrawlError> {
        let link = item
            .link
            .as_deref()
            .ok_or_else(|| CrawlError::MissingLink(item.title.clone()))?;
        require_http_url("detail link", link)?;

        tracing::debug!(%link, "Opening detail page");
        navigate_within(ctx, link, LoadState::Load, self.config.detail_timeout).await?;
        let snapshot = bounded("snapshot", self.config.script_timeout, ctx.snapshot()).await?;

        Ok(self.inspect(&snapshot))
    }

    fn inspect(&self, snapshot: &PageSnapshot) -> PageVerdict {
        let doc = Html::parse_document(&snapshot.html);
        if let Some(marker) = self.blocks.detect(&doc) {
            return PageVerdict::Blocked(marker.to_string());
        }
        let base = Url::parse(&snapshot.url).ok();
        PageVerdict::Loaded(self.rules.detail_in(&doc, base.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{OutcomeKind, Section};
    use crate::pacing::PacingConfig;
    use crate::testutil::{MockPage, MockSession};

    const JOB_PAGE: &str = r#"<html><body>
        <div class="company-header"><h3>Acme</h3><p>Rockets and more.</p></div>
        <h2>Description</h2>
        <p>Build the listing UI.</p>
        <h2>Requirements</h2>
        <p>React and TypeScript.</p>
    </body></html>"#;

    const CHALLENGE_PAGE: &str = r#"<html><body>
        <h1>Just a moment...</h1>
        <div class="company-header"><h3>Acme</h3></div>
        <h2>Description</h2><p>Should not be extracted.</p>
    </body></html>"#;

    fn fast_config() -> CrawlConfig {
        CrawlConfig {
            pacing: PacingConfig::new(Duration::ZERO),
            ..Default::default()
        }
    }

    fn crawler(session: MockSession, config: CrawlConfig) -> DetailCrawler<MockSession> {
        let rules = ExtractionRules::new(&config.rules).unwrap();
        DetailCrawler::new(session, Arc::new(config), Arc::new(rules))
    }

    fn item(title: &str, link: &str) -> ListingItem {
        ListingItem::new(title, Some(link.to_string()))
    }

    #[tokio::test]
    async fn extracts_detail_page() {
        let session = MockSession::new().with_html("https://x/job/1", JOB_PAGE);
        let crawler = crawler(session.clone(), fast_config());

        let batch = crawler
            .crawl(&[item("Frontend Engineer", "https://x/job/1")])
            .await
            .unwrap();

        assert!(batch.ok);
        assert_eq!(batch.count, 1);
        let DetailOutcome::Detail { item, detail } = &batch.results[0] else {
            panic!("expected detail, got {:?}", batch.results[0]);
        };
        assert_eq!(item.title, "Frontend Engineer");
        assert_eq!(item.link.as_deref(), Some("https://x/job/1"));
        assert_eq!(detail.company_name.as_deref(), Some("Acme"));
        assert_eq!(
            detail.sections,
            vec![
                Section {
                    section: "Description".into(),
                    content: "Build the listing UI.".into(),
                },
                Section {
                    section: "Requirements".into(),
                    content: "React and TypeScript.".into(),
                },
            ]
        );
        assert_eq!(
            session.record().navigations,
            vec![("https://x/job/1".to_string(), LoadState::Load)]
        );
    }

    #[tokio::test]
    async fn challenge_page_is_blocked_regardless_of_content() {
        let session = MockSession::new().with_html("https://x/job/1", CHALLENGE_PAGE);
        let crawler = crawler(session, fast_config());

        let batch = crawler
            .crawl(&[item("Frontend Engineer", "https://x/job/1")])
            .await
            .unwrap();

        assert_eq!(
            batch.results,
            vec![DetailOutcome::Blocked {
                item: item("Frontend Engineer", "https://x/job/1"),
            }]
        );
    }

    #[tokio::test]
    async fn failure_is_isolated_and_order_preserved() {
        let session = MockSession::new()
            .with_html("https://x/job/1", JOB_PAGE)
            .with_page("https://x/job/2", MockPage::Error("net::ERR_CONNECTION_REFUSED".into()))
            .with_html("https://x/job/3", CHALLENGE_PAGE)
            .with_html("https://x/job/4", JOB_PAGE);
        let crawler = crawler(session.clone(), fast_config());
        let items = vec![
            item("One", "https://x/job/1"),
            item("Two", "https://x/job/2"),
            item("Three", "https://x/job/3"),
            item("Four", "https://x/job/4"),
        ];

        let batch = crawler.crawl(&items).await.unwrap();

        assert!(batch.ok);
        assert_eq!(batch.count, 4);
        let kinds: Vec<_> = batch.results.iter().map(DetailOutcome::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OutcomeKind::Detail,
                OutcomeKind::Failed,
                OutcomeKind::Blocked,
                OutcomeKind::Detail
            ]
        );
        let returned: Vec<_> = batch.results.iter().map(|o| o.item().clone()).collect();
        assert_eq!(returned, items);

        let DetailOutcome::Failed { error, .. } = &batch.results[1] else {
            panic!("expected failure");
        };
        assert_eq!(error, "Navigation error: net::ERR_CONNECTION_REFUSED");
        assert_eq!(session.navigated_urls().len(), 4);
    }

    #[tokio::test]
    async fn missing_link_fails_without_navigation() {
        let session = MockSession::new().with_html("https://x/job/2", JOB_PAGE);
        let crawler = crawler(session.clone(), fast_config());

        let batch = crawler
            .crawl(&[
                ListingItem::new("No link", None),
                item("Linked", "https://x/job/2"),
            ])
            .await
            .unwrap();

        assert_eq!(batch.results[0].kind(), OutcomeKind::Failed);
        assert_eq!(batch.results[1].kind(), OutcomeKind::Detail);
        assert_eq!(session.navigated_urls(), vec!["https://x/job/2".to_string()]);
    }

    #[tokio::test]
    async fn non_http_link_fails_without_navigation() {
        let session = MockSession::new().with_html("https://x/job/2", JOB_PAGE);
        let crawler = crawler(session.clone(), fast_config());

        let batch = crawler
            .crawl(&[
                item("Local file", "file:///etc/passwd"),
                item("Script", "javascript:alert(1)"),
                item("Linked", "https://x/job/2"),
            ])
            .await
            .unwrap();

        assert!(matches!(
            &batch.results[0],
            DetailOutcome::Failed { error, .. } if error.contains("scheme 'file' is not allowed")
        ));
        assert_eq!(batch.results[1].kind(), OutcomeKind::Failed);
        assert_eq!(batch.results[2].kind(), OutcomeKind::Detail);
        assert_eq!(session.navigated_urls(), vec!["https://x/job/2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detail_page_times_out_and_batch_continues() {
        let session = MockSession::new()
            .with_page("https://x/job/1", MockPage::Hang)
            .with_html("https://x/job/2", JOB_PAGE);
        let crawler = crawler(session, fast_config());

        let batch = crawler
            .crawl(&[item("Slow", "https://x/job/1"), item("Fast", "https://x/job/2")])
            .await
            .unwrap();

        let DetailOutcome::Failed { error, .. } = &batch.results[0] else {
            panic!("expected failure");
        };
        assert_eq!(error, "Navigation to https://x/job/1 timed out after 3s");
        assert_eq!(batch.results[1].kind(), OutcomeKind::Detail);
    }

    #[tokio::test]
    async fn empty_input_returns_empty_batch_without_browser() {
        let session = MockSession::failing_launch("should not launch");
        let crawler = crawler(session, fast_config());

        let batch = crawler.crawl(&[]).await.unwrap();

        assert!(batch.ok);
        assert_eq!(batch.count, 0);
        assert!(batch.results.is_empty());
    }

    #[tokio::test]
    async fn launch_failure_fails_whole_call() {
        let session = MockSession::failing_launch("chrome not found");
        let crawler = crawler(session, fast_config());

        let err = crawler
            .crawl(&[item("One", "https://x/job/1")])
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::LaunchFailure(_)));
    }

    #[tokio::test]
    async fn one_context_per_batch_closed_once() {
        let session = MockSession::new()
            .with_html("https://x/job/1", JOB_PAGE)
            .with_html("https://x/job/2", JOB_PAGE);
        let crawler = crawler(session.clone(), fast_config());

        crawler
            .crawl(&[item("One", "https://x/job/1"), item("Two", "https://x/job/2")])
            .await
            .unwrap();

        let record = session.record();
        assert_eq!(record.acquired, 1);
        assert_eq!(record.closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_items_whatever_the_outcome() {
        let session = MockSession::new()
            .with_page("https://x/job/1", MockPage::Error("boom".into()))
            .with_html("https://x/job/2", CHALLENGE_PAGE)
            .with_html("https://x/job/3", JOB_PAGE);
        let config = CrawlConfig {
            pacing: PacingConfig::new(Duration::from_secs(3)),
            ..Default::default()
        };
        let crawler = crawler(session, config);

        let start = tokio::time::Instant::now();
        crawler
            .crawl(&[
                item("One", "https://x/job/1"),
                item("Two", "https://x/job/2"),
                item("Three", "https://x/job/3"),
            ])
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(9), "elapsed {elapsed:?}");
    }

    #[test]
    fn block_detector_ignores_script_text() {
        let detector = BlockDetector::new(&["Just a moment...".to_string()]);
        let doc = Html::parse_document(
            "<body><p>Hello</p><script>if (x) { title = 'Just a moment...'; }</script></body>",
        );
        assert_eq!(detector.detect(&doc), None);
    }

    #[test]
    fn block_detector_matches_marker_split_across_blocks() {
        let detector = BlockDetector::new(&["Verify you are human".to_string()]);
        let doc = Html::parse_document("<body><div>Verify you are</div><div>human</div></body>");
        assert_eq!(detector.detect(&doc), Some("Verify you are human"));
    }

    #[test]
    fn block_detector_without_markers_never_blocks() {
        let detector = BlockDetector::new(&[]);
        let doc = Html::parse_document("<body>Just a moment...</body>");
        assert_eq!(detector.detect(&doc), None);
    }
}
