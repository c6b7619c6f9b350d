//! Integration tests for the report endpoint.
//!
//! These tests verify the full request/response cycle through the HTTP API.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use serde_json::json;

use common::{app, dry_run_config, post_report, send};
use report_relay::config::Config;
use report_relay::cors::AllowList;

fn create_test_server(config: Config) -> TestServer {
    TestServer::new(app(config)).unwrap()
}

#[tokio::test]
async fn test_liveness() {
    let server = create_test_server(dry_run_config());

    let response = server.get("/report-bug").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dryRun"], true);

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_dry_run_submission() {
    let server = create_test_server(dry_run_config());

    let response = server
        .post("/report-bug")
        .json(&json!({
            "title": "T",
            "description": "D",
            "type": "bug"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["dryRun"], true);

    let key = body["dedupeKey"].as_str().unwrap();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_legacy_path() {
    let server = create_test_server(dry_run_config());

    let response = server
        .post("/.netlify/functions/report-bug")
        .json(&json!({
            "title": "Test crash when opening menu",
            "description": "Game crashes after pressing ESC on main screen. Repro 3/3.",
            "type": "bug",
            "source": "game",
            "appVersion": "1.0.0",
            "buildId": "local-dev",
            "os": "Windows 11",
            "notify": false
        }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_same_report_same_dedupe_key() {
    let server = create_test_server(dry_run_config());
    let report = json!({ "title": "T", "description": "D", "appVersion": "1.0.0" });

    let first: serde_json::Value = server.post("/report-bug").json(&report).await.json();
    let second: serde_json::Value = server.post("/report-bug").json(&report).await.json();

    assert_eq!(first["dedupeKey"], second["dedupeKey"]);
}

#[tokio::test]
async fn test_invalid_json() {
    let server = create_test_server(dry_run_config());

    let response = server.post("/report-bug").text("{not json").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_oversized_body() {
    let app = app(dry_run_config());
    let padding = "A".repeat(3 * 1024 * 1024);
    let report = json!({ "title": "T", "description": "D", "logs": padding });

    let reply = send(&app, post_report(&report, "203.0.113.90")).await;

    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.json()["error"], "Request body too large");
    assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_missing_required_fields() {
    let server = create_test_server(dry_run_config());

    for report in [
        json!({ "title": "T" }),
        json!({ "description": "D" }),
        json!({ "title": "   ", "description": "D" }),
        json!([]),
    ] {
        let response = server.post("/report-bug").json(&report).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Missing required fields: title and description");
    }
}

#[tokio::test]
async fn test_preflight() {
    let app = app(dry_run_config());

    let reply = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/report-bug")
            .header("origin", "https://pdoom1.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(reply.body.is_empty());
    assert_eq!(
        reply.header("access-control-allow-origin"),
        Some("https://pdoom1.com")
    );
    assert_eq!(
        reply.header("access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        reply.header("access-control-allow-headers"),
        Some("Content-Type, Authorization")
    );
    assert_eq!(reply.header("access-control-max-age"), Some("86400"));
    assert_eq!(reply.header("vary"), Some("Origin"));
}

#[tokio::test]
async fn test_unsupported_method() {
    let app = app(dry_run_config());

    for method in ["DELETE", "PUT", "PATCH"] {
        let reply = send(
            &app,
            Request::builder()
                .method(method)
                .uri("/report-bug")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(reply.json()["error"], "Method Not Allowed");
        // Errors carry CORS headers too
        assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
    }
}

#[tokio::test]
async fn test_allow_list() {
    let config = Config {
        allowed_origins: AllowList::parse("https://pdoom1.com, https://*.netlify.app"),
        ..dry_run_config()
    };
    let app = app(config);

    let from = |origin: &str| {
        Request::builder()
            .method("GET")
            .uri("/report-bug")
            .header("origin", origin)
            .body(Body::empty())
            .unwrap()
    };

    let reply = send(&app, from("https://deploy-preview-7--pdoom1.netlify.app")).await;
    assert_eq!(
        reply.header("access-control-allow-origin"),
        Some("https://deploy-preview-7--pdoom1.netlify.app")
    );

    let reply = send(&app, from("https://evil.example")).await;
    assert_eq!(
        reply.header("access-control-allow-origin"),
        Some("https://pdoom1.com")
    );
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let app = app(dry_run_config());
    let report = json!({ "title": "T", "description": "D" });

    for _ in 0..5 {
        let reply = send(&app, post_report(&report, "198.51.100.1")).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let reply = send(&app, post_report(&report, "198.51.100.1")).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.json()["error"], "Rate limit exceeded");

    // Another client still has its full quota
    let reply = send(&app, post_report(&report, "198.51.100.2, 10.0.0.1")).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_applies_before_sanitation() {
    let app = app(dry_run_config());
    let invalid = json!({ "title": "" });

    for _ in 0..5 {
        let reply = send(&app, post_report(&invalid, "198.51.100.9")).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    let valid = json!({ "title": "T", "description": "D" });
    let reply = send(&app, post_report(&valid, "198.51.100.9")).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_not_configured() {
    // Not dry-run, but no dispatch credentials
    let server = create_test_server(Config::default());

    let response = server
        .post("/report-bug")
        .json(&json!({ "title": "T", "description": "D" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Server not configured")
    );
}
