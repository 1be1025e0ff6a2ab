use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use jobcrawl_core::testutil::{MockPage, MockSession};

use crate::integration::common::{
    CHALLENGE_PAGE, JOB_PAGE, LISTING_PAGE, LISTING_URL, post_json, send, setup_test_app,
};

fn listing_session() -> MockSession {
    MockSession::new()
        .with_html(LISTING_URL, LISTING_PAGE)
        .with_heights(vec![1000, 2000, 2000])
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app(MockSession::new(), None);

    let (status, json) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));
    assert_eq!(app.session.record().acquired, 0);
}

#[tokio::test]
async fn listing_returns_jobs_in_page_order() {
    let app = setup_test_app(listing_session(), None);

    let (status, json) = send(
        &app,
        post_json("/v1/listing", &json!({"url": LISTING_URL}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "ok": true,
            "count": 2,
            "jobs": [
                {"title": "Frontend Engineer", "link": "https://jobs.test/job/1"},
                {"title": "Backend Engineer", "link": "https://jobs.test/job/2"},
            ]
        })
    );
}

#[tokio::test]
async fn listing_without_url_uses_default() {
    let app = setup_test_app(listing_session(), Some(LISTING_URL));

    let request = Request::post("/v1/listing").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(app.session.navigated_urls(), vec![LISTING_URL.to_string()]);
}

#[tokio::test]
async fn listing_without_url_or_default_returns_400() {
    let app = setup_test_app(listing_session(), None);

    let (status, json) = send(&app, post_json("/v1/listing", "{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("JOBCRAWL_LISTING_URL"));
    assert_eq!(app.session.record().acquired, 0);
}

#[tokio::test]
async fn listing_navigation_error_returns_502_envelope() {
    let session = MockSession::new()
        .with_page(LISTING_URL, MockPage::Error("net::ERR_CONNECTION_RESET".into()));
    let app = setup_test_app(session, None);

    let (status, json) = send(
        &app,
        post_json("/v1/listing", &json!({"url": LISTING_URL}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        json,
        json!({"ok": false, "error": "Navigation error: net::ERR_CONNECTION_RESET"})
    );
    assert_eq!(app.session.record().closed, 1);
}

#[tokio::test(start_paused = true)]
async fn listing_timeout_returns_504() {
    let session = MockSession::new().with_page(LISTING_URL, MockPage::Hang);
    let app = setup_test_app(session, None);

    let (status, json) = send(
        &app,
        post_json("/v1/listing", &json!({"url": LISTING_URL}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["ok"], false);
}

#[tokio::test]
async fn launch_failure_returns_503() {
    let app = setup_test_app(MockSession::failing_launch("chrome not found"), None);

    let (status, json) = send(
        &app,
        post_json("/v1/listing", &json!({"url": LISTING_URL}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json,
        json!({"ok": false, "error": "Browser launch failed: chrome not found"})
    );
}

#[tokio::test]
async fn details_returns_one_result_per_job() {
    let session = MockSession::new()
        .with_html("https://jobs.test/job/1", JOB_PAGE)
        .with_html("https://jobs.test/job/2", CHALLENGE_PAGE);
    let app = setup_test_app(session, None);

    let body = json!({
        "jobs": [
            {"title": "Frontend Engineer", "link": "https://jobs.test/job/1"},
            {"title": "Backend Engineer", "link": "https://jobs.test/job/2"},
            {"title": "Staff Designer", "link": "https://jobs.test/job/3"},
        ]
    });
    let (status, json) = send(&app, post_json("/v1/details", &body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["count"], 3);

    let results = json["results"].as_array().unwrap();
    assert_eq!(
        results[0],
        json!({
            "outcome": "detail",
            "title": "Frontend Engineer",
            "link": "https://jobs.test/job/1",
            "companyName": "Acme",
            "companyDescription": "Rockets.",
            "jobPills": ["Remote", "Full-time"],
            "skillsPills": ["React"],
            "applyLink": "https://boards.greenhouse.io/acme/jobs/1",
            "sections": [
                {"section": "Description", "content": "Build the listing UI."},
                {"section": "Requirements", "content": "React and TypeScript."},
            ]
        })
    );
    assert_eq!(
        results[1],
        json!({
            "outcome": "blocked",
            "title": "Backend Engineer",
            "link": "https://jobs.test/job/2",
        })
    );
    assert_eq!(results[2]["outcome"], "failed");
    assert_eq!(results[2]["title"], "Staff Designer");
    assert!(
        results[2]["error"]
            .as_str()
            .unwrap()
            .contains("ERR_NAME_NOT_RESOLVED")
    );
}

#[tokio::test]
async fn details_accepts_listing_response_verbatim() {
    let session = MockSession::new().with_html("https://jobs.test/job/1", JOB_PAGE);
    let app = setup_test_app(session, None);

    let listing = json!({
        "ok": true,
        "count": 1,
        "jobs": [{"title": "Frontend Engineer", "link": "https://jobs.test/job/1"}]
    });
    let (status, json) = send(&app, post_json("/v1/details", &listing.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["outcome"], "detail");
}

#[tokio::test]
async fn details_with_no_jobs_returns_empty_batch() {
    let app = setup_test_app(MockSession::new(), None);

    let (status, json) = send(&app, post_json("/v1/details", r#"{"jobs": []}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": true, "count": 0, "results": []}));
    assert_eq!(app.session.record().acquired, 0);
}

#[tokio::test]
async fn details_with_malformed_body_returns_400() {
    let app = setup_test_app(MockSession::new(), None);

    let (status, json) = send(&app, post_json("/v1/details", r#"{"jobs": [{"link": 1}]}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert!(json["error"].is_string());
}
