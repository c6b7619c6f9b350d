//! Shared helpers for integration tests.
//!
//! Outbound collaborators (hCaptcha, the Gist API and the dispatch endpoint)
//! are replaced by small axum routers served on an ephemeral local port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use report_relay::api::{AppState, router};
use report_relay::config::{Config, VerificationConfig};

/// Token the mock verification service accepts.
pub const GOOD_TOKEN: &str = "good-token";

/// Config for a dry-run relay without verification.
pub fn dry_run_config() -> Config {
    Config {
        dry_run: true,
        ..Config::default()
    }
}

/// Build the production router for `config`.
pub fn app(config: Config) -> Router {
    router(AppState::from_config(config))
}

/// Serve `app` on 127.0.0.1 and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Requests seen by the mock GitHub API.
#[derive(Clone, Default)]
pub struct MockGitHub {
    pub dispatches: Arc<Mutex<Vec<Value>>>,
    pub gists: Arc<Mutex<Vec<Value>>>,
    pub authorizations: Arc<Mutex<Vec<String>>>,
    pub gist_status: StatusCode,
    pub dispatch_status: StatusCode,
}

impl MockGitHub {
    pub fn new(gist_status: StatusCode, dispatch_status: StatusCode) -> Self {
        Self {
            gist_status,
            dispatch_status,
            ..Default::default()
        }
    }

    /// Serve the mock and return its base URL.
    pub async fn serve(&self) -> String {
        let app = Router::new()
            .route("/gists", post(create_gist))
            .route("/repos/:owner/:name/dispatches", post(create_dispatch))
            .with_state(self.clone());
        spawn(app).await
    }

    pub fn dispatched(&self) -> Vec<Value> {
        self.dispatches.lock().unwrap().clone()
    }

    pub fn gists_created(&self) -> Vec<Value> {
        self.gists.lock().unwrap().clone()
    }
}

async fn create_gist(
    State(mock): State<MockGitHub>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.gists.lock().unwrap().push(body);
    if mock.gist_status.is_success() {
        (
            StatusCode::CREATED,
            Json(json!({ "html_url": "https://gist.github.com/relay/abc123" })),
        )
            .into_response()
    } else {
        (mock.gist_status, "gist store unavailable").into_response()
    }
}

async fn create_dispatch(
    State(mock): State<MockGitHub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        mock.authorizations.lock().unwrap().push(auth.to_string());
    }
    mock.dispatches.lock().unwrap().push(body);
    if mock.dispatch_status.is_success() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (mock.dispatch_status, "dispatch rejected").into_response()
    }
}

/// Form submissions seen by the mock hCaptcha service.
#[derive(Clone, Default)]
pub struct MockHCaptcha {
    pub requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockHCaptcha {
    /// Serve the mock and return the siteverify URL.
    pub async fn serve(&self) -> String {
        let app = Router::new()
            .route("/siteverify", post(site_verify))
            .with_state(self.clone());
        format!("{}/siteverify", spawn(app).await)
    }
}

async fn site_verify(
    State(mock): State<MockHCaptcha>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let success = form.get("response").map(String::as_str) == Some(GOOD_TOKEN);
    mock.requests.lock().unwrap().push(form);
    if success {
        Json(json!({ "success": true }))
    } else {
        Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
    }
}

/// Config that dispatches to `github_url` for real.
pub fn live_config(github_url: &str) -> Config {
    Config {
        dispatch_token: Some("dispatch-token".to_string()),
        dispatch_repo: Some("owner/site".to_string()),
        gist_token: Some("gist-token".to_string()),
        github_api_url: github_url.to_string(),
        ..Config::default()
    }
}

/// Add hCaptcha settings pointing at `verify_url`.
pub fn with_verification(config: Config, verify_url: &str) -> Config {
    Config {
        verification: Some(VerificationConfig {
            site_key: "test-sitekey".to_string(),
            secret: "test-secret".to_string(),
        }),
        hcaptcha_verify_url: verify_url.to_string(),
        ..config
    }
}

/// A parsed response from [`send`].
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send `request` through `app` without a network listener.
pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// A JSON POST to the report endpoint from `client_ip`.
pub fn post_report(body: &Value, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/report-bug")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}
