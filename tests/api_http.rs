// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - POST /grade
// - POST /grade/html
// - POST /explain  (suppressed matches are reported)
// - GET  /catalog
// - timeout maps to 503

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use privacy_grader::api::{self, ApiState};
use privacy_grader::PolicyScorer;

const BODY_LIMIT: usize = 1024 * 1024;

/// Build the same Router the binary uses (minus /metrics).
fn test_router() -> Router {
    api::router(ApiState::builtin().expect("built-in state"))
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn grade_returns_score_and_labels() {
    let (status, v) = post_json(
        test_router(),
        "/grade",
        json!({ "text": "This service uses end-to-end encryption and is open source. We do not sell your personal data." }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["score"], 93);
    assert_eq!(v["grade"], "A");
    assert!(v["positive_labels"]
        .as_array()
        .unwrap()
        .contains(&json!("Open source")));
    assert_eq!(v["negative_labels"], json!([]));
}

#[tokio::test]
async fn grade_html_extracts_before_scoring() {
    let html = r#"<html><head><style>.x{}</style></head><body>
        <nav>We sell your personal data</nav>
        <p>We use <b>end-to-end</b> encryption.</p>
        </body></html>"#;
    let (status, v) = post_json(test_router(), "/grade/html", json!({ "html": html })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["word_count"], 4);
    assert_eq!(v["result"]["score"], 65);
    assert_eq!(v["result"]["negative_labels"], json!([]));
}

#[tokio::test]
async fn explain_lists_suppressed_matches() {
    let (status, v) = post_json(
        test_router(),
        "/explain",
        json!({ "text": "We do not sell your personal data." }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["result"]["score"], 70);
    let events = v["events"].as_array().expect("events array");
    let sells = events
        .iter()
        .find(|e| e["rule_id"] == "sells_data")
        .expect("sells_data event");
    assert_eq!(sells["negated"], true);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (status, _) = post_json(test_router(), "/grade", json!({ "txt": "oops" })).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn catalog_lists_rules_by_category() {
    let req = Request::builder()
        .method("GET")
        .uri("/catalog")
        .body(Body::empty())
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["scoring"]["baseline"], 50);
    let positive = v["positive"].as_array().unwrap();
    let negative = v["negative"].as_array().unwrap();
    assert!(positive.iter().all(|r| r["weight"].as_i64().unwrap() > 0));
    assert!(negative.iter().all(|r| r["weight"].as_i64().unwrap() < 0));
    assert!(positive.iter().any(|r| r["id"] == "e2e_encryption"));
}

#[tokio::test]
async fn zero_deadline_maps_to_service_unavailable() {
    let state = ApiState::new(Arc::new(PolicyScorer::builtin().unwrap()), Duration::ZERO);
    let (status, v) = post_json(
        api::router(state),
        "/grade",
        json!({ "text": "open source ".repeat(100_000) }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap().contains("deadline"));
}
