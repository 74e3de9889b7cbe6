//! Integration tests for briefing-server API endpoints
//!
//! Each test builds the router over a temporary content root and feedback
//! database and drives it with `oneshot`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use briefing_common::{ContentRepository, FeedbackStore};
use briefing_server::{build_router, AppState};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const EDITION_JSON: &str = r#"{
    "title": "Weekly Aviation Briefing",
    "subtitle": "Weekly Executive Aviation Briefing",
    "period": "27 Oct - 2 Nov 2025",
    "audio_files": {
        "Executive Summary": "Executive Summary.m4a",
        "Deep Dive": "Deep Dive.mp3"
    },
    "top_developments": [
        {"title": "Lufthansa Insources Ground Handling at Munich Hub",
         "description": "Insourcing. Citation: (1: Ground Handling/Region_Europe). Details at https://example.com/lufthansa."}
    ],
    "regional_overviews": [
        {"title": "Europe", "description": "Mixed picture."}
    ]
}"#;

/// Test fixture: content root with one edition, plus a fresh database
struct TestApp {
    _tmp: TempDir,
    app: Router,
    store: FeedbackStore,
}

async fn setup_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let content_root = tmp.path().join("content");
    let edition_dir = content_root.join("Week 44");
    fs::create_dir_all(&edition_dir).unwrap();
    fs::write(edition_dir.join("Week 44.json"), EDITION_JSON).unwrap();
    fs::write(edition_dir.join("Executive Summary.m4a"), b"m4a-bytes").unwrap();

    build_app(tmp, &content_root, None).await
}

async fn build_app(tmp: TempDir, content_root: &Path, legacy: Option<&str>) -> TestApp {
    let store = FeedbackStore::initialize(&tmp.path().join("feedback.db"))
        .await
        .unwrap();
    let state = AppState::new(ContentRepository::new(content_root), store.clone())
        .with_legacy_override(legacy.map(|name| tmp.path().join(name)));

    TestApp {
        app: build_router(state),
        store,
        _tmp: tmp,
    }
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&extract_bytes(body).await).expect("Should parse JSON")
}

// =============================================================================
// Health and build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "briefing-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/api/buildinfo")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Editions and page model
// =============================================================================

#[tokio::test]
async fn test_editions_listed() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/api/editions")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["name"], "Week 44");
    assert!(body[0]["modified"].is_string());
}

#[tokio::test]
async fn test_page_defaults_to_latest_edition() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = extract_json(response.into_body()).await;
    assert_eq!(page["selected"], "Week 44");
    assert_eq!(page["edition"]["title"], "Weekly Aviation Briefing");
    assert_eq!(page["edition"]["top_developments"].as_array().unwrap().len(), 1);
    assert_eq!(page["feedback"], json!([]));

    // Audio keeps document order; the mp3 is not on disk
    assert_eq!(page["audio"][0]["label"], "Executive Summary");
    assert_eq!(page["audio"][0]["available"], true);
    assert_eq!(page["audio"][1]["available"], false);
    assert_eq!(page["audio"][1]["mime_type"], "audio/mpeg");
    let notices = page["notices"].as_array().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["kind"], "audio_missing");
}

#[tokio::test]
async fn test_page_items_carry_link_and_citation() {
    let t = setup_app().await;

    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();

    let page = extract_json(response.into_body()).await;
    let item = &page["edition"]["top_developments"][0];
    assert_eq!(item["link"], "https://example.com/lufthansa");
    assert_eq!(item["citation"], "1: Ground Handling/Region_Europe");
    let region = &page["edition"]["regional_overviews"][0];
    assert!(region["link"].is_null());
    assert!(region["citation"].is_null());
}

#[tokio::test]
async fn test_page_unknown_edition_still_renders() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request("GET", "/api/page?edition=Week%2099"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = extract_json(response.into_body()).await;
    assert!(page["edition"].is_null());
    assert_eq!(page["notices"][0]["kind"], "content_missing");
    assert_eq!(page["editions"][0]["name"], "Week 44");
}

#[tokio::test]
async fn test_page_with_empty_content_root() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("empty");
    let t = build_app(tmp, &root, None).await;

    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = extract_json(response.into_body()).await;
    assert!(page["edition"].is_null());
    assert!(page["selected"].is_null());
    assert_eq!(page["notices"][0]["kind"], "content_missing");
}

#[tokio::test]
async fn test_page_falls_back_to_builtin_briefing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("empty");
    let t = build_app(tmp, &root, Some("content.json")).await;

    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();

    let page = extract_json(response.into_body()).await;
    assert_eq!(page["selected"], "default");
    assert_eq!(page["edition"]["title"], "Bram's AI Newsletter");
    assert_eq!(
        page["edition"]["top_developments"][0]["title"],
        "Singapore Mandates SAF Procurement Through New State Entity"
    );
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn test_submit_and_list_feedback() {
    let t = setup_app().await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "/api/feedback",
            json!({
                "item_title": "Europe",
                "edition": "Week 44",
                "rating": "up",
                "comment": "great work"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "saved");
    assert!(body["id"].is_i64());

    let response = t
        .app
        .clone()
        .oneshot(test_request("GET", "/api/feedback?edition=Week%2044"))
        .await
        .unwrap();
    let entries = extract_json(response.into_body()).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["item_title"], "Europe");
    assert_eq!(entries[0]["rating"], "up");
    assert_eq!(entries[0]["comment"], "great work");

    // The page model shows the same feedback
    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();
    let page = extract_json(response.into_body()).await;
    assert_eq!(page["feedback"][0]["comment"], "great work");
}

#[tokio::test]
async fn test_blank_feedback_skipped() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(json_request(
            "/api/feedback",
            json!({"item_title": "Europe", "edition": "Week 44", "comment": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "skipped");
    assert!(t.store.list_for_edition("Week 44").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_fault_reported() {
    let t = setup_app().await;
    t.store.pool().close().await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "/api/feedback",
            json!({"item_title": "Europe", "edition": "Week 44", "comment": "lost?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "failed");
    assert!(body["notice"].is_string());

    // The page still renders, with a storage notice
    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = extract_json(response.into_body()).await;
    assert_eq!(page["edition"]["title"], "Weekly Aviation Briefing");
    let kinds: Vec<&str> = page["notices"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"storage_fault"));
}

#[tokio::test]
async fn test_export_csv_attachment() {
    let t = setup_app().await;
    t.store
        .append("Europe", "solid, as usual", "Week 44", briefing_common::Rating::Down)
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(test_request("GET", "/api/feedback/export?edition=Week%2044"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"feedback-Week_44.csv\""
    );
    let text = String::from_utf8(extract_bytes(response.into_body()).await).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Item,Rating,Comment,Submitted At"));
    assert!(lines.next().unwrap().starts_with("Europe,down,\"solid, as usual\","));
}

// =============================================================================
// Audio
// =============================================================================

#[tokio::test]
async fn test_audio_served_with_mime_type() {
    let t = setup_app().await;

    let response = t
        .app
        .oneshot(test_request(
            "GET",
            "/editions/Week%2044/audio/Executive%20Summary.m4a",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mp4");
    assert_eq!(extract_bytes(response.into_body()).await, b"m4a-bytes");
}

#[tokio::test]
async fn test_unservable_audio_flagged_on_page() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("content");
    let edition_dir = root.join("Week 45");
    fs::create_dir_all(edition_dir.join("audio")).unwrap();
    fs::write(
        edition_dir.join("Week 45.json"),
        r#"{"title": "T", "audio_files": {"Summary": "audio/s.mp3"}}"#,
    )
    .unwrap();
    fs::write(edition_dir.join("audio").join("s.mp3"), b"ID3").unwrap();
    let t = build_app(tmp, &root, None).await;

    let response = t.app.oneshot(test_request("GET", "/api/page")).await.unwrap();

    let page = extract_json(response.into_body()).await;
    assert_eq!(page["audio"][0]["available"], false);
    assert_eq!(page["notices"][0]["kind"], "audio_missing");
}

#[tokio::test]
async fn test_audio_not_found() {
    let t = setup_app().await;

    for uri in [
        "/editions/Week%2044/audio/Deep%20Dive.mp3",
        "/editions/Week%2044/audio/.hidden",
        "/editions/Week%2044/audio/..%2FWeek%2044.json",
        "/editions/Week%2099/audio/Executive%20Summary.m4a",
    ] {
        let response = t.app.clone().oneshot(test_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

// =============================================================================
// UI
// =============================================================================

#[tokio::test]
async fn test_ui_shell_served() {
    let t = setup_app().await;

    let response = t.app.clone().oneshot(test_request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(extract_bytes(response.into_body()).await).unwrap();
    assert!(html.contains("/static/app.js"));

    let response = t.app.oneshot(test_request("GET", "/static/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );
}
