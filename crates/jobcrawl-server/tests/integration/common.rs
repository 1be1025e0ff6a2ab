use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use jobcrawl_core::pacing::PacingConfig;
use jobcrawl_core::testutil::MockSession;
use jobcrawl_core::{CrawlConfig, CrawlService};
use jobcrawl_server::routes;
use jobcrawl_server::state::AppState;

pub const LISTING_URL: &str = "https://jobs.test/?page=1";

pub const LISTING_PAGE: &str = r#"<html><body>
    <h3 class="text-lg font-semibold text-primary mr-4"><a href="/job/1">Frontend Engineer</a></h3>
    <h3 class="text-lg font-semibold text-primary mr-4"><a href="/job/2">Backend Engineer</a></h3>
</body></html>"#;

pub const JOB_PAGE: &str = r#"<html><body>
    <div class="company-header"><h3>Acme</h3><p>Rockets.</p></div>
    <div class="flex flex-wrap gap-2"><a>Remote</a><a>Full-time</a></div>
    <div class="flex flex-wrap gap-2"><a>React</a></div>
    <a href="https://boards.greenhouse.io/acme/jobs/1">Apply</a>
    <h2>Description</h2><p>Build the listing UI.</p>
    <h2>Requirements</h2><p>React and TypeScript.</p>
</body></html>"#;

pub const CHALLENGE_PAGE: &str = "<html><body><h1>Verify you are human</h1></body></html>";

pub struct TestApp {
    pub router: Router,
    pub session: MockSession,
}

/// Router over a mock browser with no pacing or scroll settle delays.
pub fn setup_test_app(session: MockSession, default_listing_url: Option<&str>) -> TestApp {
    let config = CrawlConfig {
        scroll_settle: Duration::ZERO,
        pacing: PacingConfig::new(Duration::ZERO),
        ..Default::default()
    };
    let state = Arc::new(AppState {
        service: CrawlService::new(session.clone(), config).expect("default rules compile"),
        default_listing_url: default_listing_url.map(String::from),
    });
    TestApp {
        router: routes::router(state),
        session,
    }
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
    let response: Response<Body> = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
