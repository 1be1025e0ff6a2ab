/// Smoke-test for `ChromeSession`.
///
/// Launches Chromium, crawls a listing page with the default rules, and prints
/// what it found. The URL comes from the first argument or
/// `JOBCRAWL_LISTING_URL`, falling back to <https://example.com> (zero jobs,
/// but it proves the browser, scroll loop, and snapshot all work).
///
/// Run with:
///   cargo run -p jobcrawl-client --example listing_smoke -- https://jobs.example/
use jobcrawl_client::{ChromeSession, LaunchConfig};
use jobcrawl_core::{CrawlConfig, CrawlService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,jobcrawl_core=debug")
        .init();

    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("JOBCRAWL_LISTING_URL").ok())
        .unwrap_or_else(|| "https://example.com".to_string());

    println!("Launching browser…");
    let session = ChromeSession::new(LaunchConfig::from_env()?);
    let service = CrawlService::new(session, CrawlConfig::from_env()?)?;

    println!("Crawling {url} …");
    let batch = service.crawl_listing(&url).await?;

    println!("OK: {} jobs", batch.count);
    for job in batch.jobs.iter().take(10) {
        println!(
            "  {} -> {}",
            job.title,
            job.link.as_deref().unwrap_or("(no link)")
        );
    }
    Ok(())
}
