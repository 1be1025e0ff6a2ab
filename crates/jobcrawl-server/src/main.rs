use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jobcrawl_client::{ChromeSession, LaunchConfig};
use jobcrawl_core::{CrawlConfig, CrawlService};
use jobcrawl_server::config::ServerConfig;
use jobcrawl_server::routes;
use jobcrawl_server::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobcrawl=info".parse()?))
        .with_target(false)
        .init();

    let server = ServerConfig::from_env()?;
    let crawl = CrawlConfig::from_env()?;
    let launch = LaunchConfig::from_env()?;

    // The browser itself starts on the first crawl request.
    let session = ChromeSession::new(launch);
    let state = Arc::new(AppState {
        service: CrawlService::new(session, crawl)?,
        default_listing_url: server.default_listing_url.clone(),
    });

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = server.bind_addr();
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
