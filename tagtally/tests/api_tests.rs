// End-to-end tests for the count endpoint: router in, stub upstream out.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tagtally::handlers::AppState;
use tagtally::server::create_router;
use tagtally_core::data::Database;
use tagtally_fetch::Fetcher;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_router() -> (TempDir, Router) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).unwrap();

    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        fetcher: Arc::new(Fetcher::with_timeout(5)),
    };

    (temp_dir, create_router(state))
}

async fn post_count(router: &Router, form_body: String) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/count")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn serve_html(body: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(body.as_bytes().to_vec()),
        )
        .mount(&mock_server)
        .await;

    mock_server
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_non_post_is_method_not_allowed() {
    let (_temp_dir, router) = test_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/count")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_form_page_is_served() {
    let (_temp_dir, router) = test_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("fetch-data-form"));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_empty_form_reports_every_failed_rule() {
    let (_temp_dir, router) = test_router();

    let (status, body) = post_count(&router, "url=&element=".to_string()).await;

    // Form-level errors still answer 200
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(
        body["errors"],
        serde_json::json!(["Invalid url", "Enter HTML element to count"])
    );
}

#[tokio::test]
async fn test_overlong_url_is_rejected() {
    let (_temp_dir, router) = test_router();

    let url = format!("http://example.com/{}", "a".repeat(500));
    let (status, body) = post_count(&router, format!("url={}&element=p", url)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(
        body["errors"],
        serde_json::json!(["URL can't be longer than 500 symbols"])
    );
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_successful_count() {
    let (_temp_dir, router) = test_router();
    let mock_server = serve_html("<html><body><p>a</p><p>b</p></body></html>").await;

    let (status, body) =
        post_count(&router, format!("url={}/&element=p", mock_server.uri())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["element"], "p");
    assert_eq!(body["domain"], "127.0.0.1");
    assert_eq!(body["urlCountForDomain"], 1);
    assert_eq!(body["totalElementCountForDomain"], 2);
    assert_eq!(body["totalElementCount"], 2);
    assert!(body["responseTime"].as_i64().unwrap() >= 0);

    // YYYY-MM-DD HH:MM:SS
    let fetch_date_time = body["fetchDateTime"].as_str().unwrap();
    assert_eq!(fetch_date_time.len(), 19);
    assert_eq!(&fetch_date_time[4..5], "-");
    assert_eq!(&fetch_date_time[10..11], " ");
}

#[tokio::test]
async fn test_zero_count_is_a_success() {
    let (_temp_dir, router) = test_router();
    let mock_server = serve_html("<html><body><p>a</p><p>b</p></body></html>").await;

    let (status, body) =
        post_count(&router, format!("url={}/&element=div", mock_server.uri())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["totalElementCountForDomain"], 0);
}

#[tokio::test]
async fn test_content_without_html_tag_is_invalid_html() {
    let (_temp_dir, router) = test_router();
    let mock_server = serve_html("plain text, no markup here").await;

    let (status, body) =
        post_count(&router, format!("url={}/&element=p", mock_server.uri())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["errors"], serde_json::json!(["Invalid HTML"]));
}

#[tokio::test]
async fn test_non_200_upstream_is_inaccessible() {
    let (_temp_dir, router) = test_router();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (status, body) =
        post_count(&router, format!("url={}/&element=p", mock_server.uri())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["errors"], serde_json::json!(["Inaccessible URL"]));
}

#[tokio::test]
async fn test_unreachable_upstream_is_inaccessible() {
    let (_temp_dir, router) = test_router();

    // Nothing listens on port 1
    let (status, body) =
        post_count(&router, "url=http://127.0.0.1:1/&element=p".to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["errors"], serde_json::json!(["Inaccessible URL"]));
}

// ============================================================================
// Deduplication Tests
// ============================================================================

#[tokio::test]
async fn test_repeat_within_window_reuses_fetch() {
    let (_temp_dir, router) = test_router();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html><body><p>a</p><p>b</p></body></html>".to_vec()),
        )
        // The second request must be answered from the store
        .expect(1)
        .mount(&mock_server)
        .await;

    let form_body = format!("url={}/&element=p", mock_server.uri());

    let (_, first) = post_count(&router, form_body.clone()).await;
    let (_, second) = post_count(&router, form_body).await;

    assert_eq!(first["ok"], true);
    assert_eq!(second["ok"], true);

    // Fetch data is reused verbatim
    assert_eq!(second["fetchDateTime"], first["fetchDateTime"]);
    assert_eq!(second["responseTime"], first["responseTime"]);
    assert_eq!(second["count"], first["count"]);

    // No second fact row was written, so the aggregates are unchanged
    assert_eq!(second["urlCountForDomain"], first["urlCountForDomain"]);
    assert_eq!(second["totalElementCount"], first["totalElementCount"]);
}

#[tokio::test]
async fn test_different_element_is_not_deduplicated() {
    let (_temp_dir, router) = test_router();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html><body><p>a</p></body></html>".to_vec()),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let (_, first) = post_count(&router, format!("url={}/&element=p", mock_server.uri())).await;
    let (_, second) =
        post_count(&router, format!("url={}/&element=body", mock_server.uri())).await;

    assert_eq!(first["ok"], true);
    assert_eq!(second["ok"], true);
    assert_eq!(first["count"], 1);
    assert_eq!(second["count"], 1);
}

// ============================================================================
// Statistics Tests
// ============================================================================

#[tokio::test]
async fn test_statistics_accumulate_across_urls() {
    let (_temp_dir, router) = test_router();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html><body><p>1</p><p>2</p></body></html>".to_vec()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html><body><p>3</p></body></html>".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let (_, first) = post_count(&router, format!("url={}/a&element=p", mock_server.uri())).await;
    assert_eq!(first["urlCountForDomain"], 1);
    assert_eq!(first["totalElementCount"], 2);

    let (_, second) = post_count(&router, format!("url={}/b&element=p", mock_server.uri())).await;
    assert_eq!(second["urlCountForDomain"], 2);
    assert_eq!(second["totalElementCountForDomain"], 3);
    assert_eq!(second["totalElementCount"], 3);

    // A repeat of an already-seen URL for a new element leaves the distinct
    // URL count alone
    let (_, third) =
        post_count(&router, format!("url={}/a&element=body", mock_server.uri())).await;
    assert_eq!(third["urlCountForDomain"], 2);
}
