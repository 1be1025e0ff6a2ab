use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};

use jobcrawl_core::error::CrawlError;
use jobcrawl_core::models::{DetailBatch, ListingBatch};
use jobcrawl_core::traits::BrowserSession;

use crate::dto::{DetailsRequest, HealthResponse, ListingRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the router. Middleware (tracing, CORS, body limit) is added by the binary.
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: BrowserSession + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/v1/listing", post(crawl_listing::<S>))
        .route("/v1/details", post(crawl_details::<S>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

/// Crawl a listing page. The body is optional; without a `url` the
/// configured default is used.
pub async fn crawl_listing<S: BrowserSession>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<ListingBatch>, ApiError> {
    let request = parse_listing_request(&body)?;
    let url = request
        .url
        .or_else(|| state.default_listing_url.clone())
        .ok_or_else(|| {
            CrawlError::InvalidInput(
                "No listing URL given and JOBCRAWL_LISTING_URL is not set".into(),
            )
        })?;

    let batch = state.service.crawl_listing(&url).await?;
    Ok(Json(batch))
}

/// Visit the detail page of every posted job, in order.
pub async fn crawl_details<S: BrowserSession>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<DetailsRequest>, JsonRejection>,
) -> Result<Json<DetailBatch>, ApiError> {
    let Json(request) = body?;
    let batch = state.service.crawl_details(&request.jobs).await?;
    Ok(Json(batch))
}

fn parse_listing_request(body: &[u8]) -> Result<ListingRequest, CrawlError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ListingRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| CrawlError::InvalidInput(format!("Invalid listing request: {e}")))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
