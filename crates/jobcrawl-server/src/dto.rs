use serde::{Deserialize, Serialize};

use jobcrawl_core::models::ListingItem;

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListingRequest {
    /// Listing page to crawl; the server default is used when absent.
    pub url: Option<String>,
}

/// Jobs to visit. Unknown fields are ignored, so a listing response can be
/// posted back as-is.
#[derive(Debug, Deserialize)]
pub struct DetailsRequest {
    pub jobs: Vec<ListingItem>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
