use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use jobcrawl_client::{ChromeSession, LaunchConfig};
use jobcrawl_core::{
    CrawlConfig, CrawlError, CrawlService, ExtractionRulesConfig, FailureEnvelope, ListingItem,
};

#[derive(Parser)]
#[command(name = "jobcrawl", version, about = "Job listing crawler for JS-rendered sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file overriding the extraction selectors
    #[arg(long, global = true, env = "JOBCRAWL_RULES_FILE")]
    rules: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long, global = true, default_value_t = false)]
    headful: bool,

    /// Chrome/Chromium binary to launch
    #[arg(long, global = true, env = "CHROME_BIN")]
    chrome_bin: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll a listing page to the end and print its jobs
    Listing {
        /// Listing page URL
        #[arg(short, long, env = "JOBCRAWL_LISTING_URL")]
        url: String,
    },

    /// Visit the detail page of every job in a JSON file
    Details {
        /// JSON array of jobs, or a listing result with a `jobs` field ("-" for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Crawl a listing page and then every job on it
    Crawl {
        /// Listing page URL
        #[arg(short, long, env = "JOBCRAWL_LISTING_URL")]
        url: String,
    },
}

/// Accepted shapes for `details --input`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailsInput {
    Items(Vec<ListingItem>),
    Envelope { jobs: Vec<ListingItem> },
}

impl DetailsInput {
    fn into_items(self) -> Vec<ListingItem> {
        match self {
            DetailsInput::Items(items) | DetailsInput::Envelope { jobs: items } => items,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobcrawl=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = build_service(&cli)?;

    let outcome = match &cli.command {
        Commands::Listing { url } => service.crawl_listing(url).await.map(|b| to_json(&b)),
        Commands::Details { input } => {
            let items = read_items(input)?;
            tracing::info!(count = items.len(), "Loaded jobs");
            service.crawl_details(&items).await.map(|b| to_json(&b))
        }
        Commands::Crawl { url } => service.crawl(url).await.map(|b| to_json(&b)),
    };

    match outcome {
        Ok(json) => {
            println!("{}", json?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Crawl failed");
            println!("{}", to_json(&FailureEnvelope::new(e.to_string()))?);
            // The session has to drop before exit for Chromium to be killed.
            Ok(ExitCode::from(exit_code(&e)))
        }
    }
}

fn build_service(cli: &Cli) -> Result<CrawlService<ChromeSession>> {
    let mut config = CrawlConfig::from_env().context("Invalid crawl configuration")?;
    if let Some(path) = &cli.rules {
        let rules = ExtractionRulesConfig::from_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        config = config.with_rules(rules);
    }

    let mut launch = LaunchConfig::from_env().context("Invalid browser configuration")?;
    if cli.headful {
        launch.headless = false;
    }
    if let Some(bin) = &cli.chrome_bin {
        launch.chrome_bin = Some(bin.clone());
    }

    CrawlService::new(ChromeSession::new(launch), config).context("Invalid extraction rules")
}

fn read_items(path: &Path) -> Result<Vec<ListingItem>> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read jobs from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read jobs file: {}", path.display()))?
    };
    parse_items(&raw)
}

fn parse_items(raw: &str) -> Result<Vec<ListingItem>> {
    let input: DetailsInput = serde_json::from_str(raw)
        .context("Expected a JSON array of jobs or an object with a `jobs` array")?;
    Ok(input.into_items())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// 2 for a browser that could not start, 1 for anything else.
fn exit_code(error: &CrawlError) -> u8 {
    if error.is_fatal() { 2 } else { 1 }
}
