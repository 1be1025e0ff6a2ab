pub mod aggregate;
pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod listing;
pub mod models;
pub mod pacing;
pub mod service;
pub mod traits;
mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{ContextProfile, CrawlConfig, ExtractionRulesConfig, PillLayout};
pub use detail::{BlockDetector, DetailCrawler};
pub use error::CrawlError;
pub use extract::ExtractionRules;
pub use listing::{ListingCrawler, ScrollPolicy, ScrollReport, scroll_until_stable};
pub use models::{
    DetailBatch, DetailOutcome, FailureEnvelope, JobDetail, ListingItem, ListingBatch,
    OutcomeKind, PageSnapshot, Section,
};
pub use pacing::{Pacer, PacingConfig};
pub use service::CrawlService;
pub use traits::{BrowserSession, BrowsingContext, LoadState};
