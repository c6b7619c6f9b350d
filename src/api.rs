//! HTTP API for the report relay.
//!
//! One endpoint, mounted at `/report-bug` and at the legacy
//! `/.netlify/functions/report-bug` path:
//!
//! - **OPTIONS**: CORS preflight, `204` with headers only
//! - **GET**: liveness probe, `{"status":"ok","dryRun":false}`
//! - **POST**: submit a report, `{"status":"queued","dedupeKey":"…","dryRun":false}`
//! - anything else: `405 {"error":"Method Not Allowed"}`
//!
//! A submission runs these steps in order: JSON parse, human verification,
//! rate limit, sanitation, attachment relay, dedupe key, dispatch.
//!
//! Logging never includes the caller's IP, email, token or attachment content.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{MethodRouter, get};
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::cors::cors_headers;
use crate::error::ReportError;
use crate::model::{DispatchPayload, IncomingReport, LivenessResponse, QueuedResponse};
use crate::rate_limit::RateLimiter;
use crate::relay::{AttachmentRelay, RelayOutcome};
use crate::sanitize::{dedupe_key, sanitize};
use crate::upstream::{Dispatcher, GistClient, HCaptchaClient};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    /// Present only when verification is configured.
    pub verifier: Option<HCaptchaClient>,
    pub relay: AttachmentRelay,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Build the state and its upstream clients from `config`.
    pub fn from_config(config: Config) -> Self {
        let verifier = config.verification.as_ref().map(|v| {
            HCaptchaClient::with_verify_url(&config.hcaptcha_verify_url, v.secret.clone())
        });
        let relay = AttachmentRelay::new(
            GistClient::with_base_url(&config.github_api_url, config.gist_token.clone()),
            config.dry_run,
        );
        let dispatcher = Dispatcher::with_base_url(
            &config.github_api_url,
            config.dispatch_token.clone(),
            config.dispatch_repo.clone(),
            config.dry_run,
        );
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Self {
            config: Arc::new(config),
            limiter,
            verifier,
            relay,
            dispatcher,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let report: MethodRouter<AppState> = get(liveness)
        .post(submit_report)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/report-bug", report.clone())
        .route("/.netlify/functions/report-bug", report)
        .route("/health", get(liveness))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(state.clone(), cors_headers))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// OPTIONS - CORS preflight. Headers are added by the CORS middleware.
pub async fn preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// GET - Liveness probe.
pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        dry_run: state.config.dry_run,
    })
}

/// Any other verb.
pub async fn method_not_allowed() -> ReportError {
    ReportError::MethodNotAllowed
}

/// POST - Submit a bug report.
///
/// # Request Body
///
/// ```json
/// {
///     "title": "Crash when opening menu",
///     "description": "Game crashes after pressing ESC. Repro 3/3.",
///     "type": "bug",
///     "appVersion": "1.0.0",
///     "attachment": { "filename": "error.log", "content": "<base64>", "size": 58 },
///     "verificationToken": "<hCaptcha token>"
/// }
/// ```
///
/// Only `title` and `description` are required.
#[instrument(skip_all, fields(dedupe_key))]
pub async fn submit_report(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<QueuedResponse>, ReportError> {
    let body = body.map_err(body_rejection)?;
    let incoming = IncomingReport::from_value(parse_body(&body)?);
    let client = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr.ip()));

    verify_caller(&state, &incoming, &client).await?;
    state.limiter.check(&RateLimiter::report_key(&client))?;

    let mut report = sanitize(&incoming)?;

    let mut payload_attachment = None;
    let mut attachment_error = None;
    if let Some(attachment) = report.attachment.take() {
        match state.relay.relay(&report.title, &attachment).await {
            RelayOutcome::Stored(reference) => payload_attachment = Some(reference),
            RelayOutcome::Failed(message) => attachment_error = Some(message),
            RelayOutcome::Skipped => {}
        }
    }

    let key = dedupe_key(&report);
    tracing::Span::current().record("dedupe_key", key.as_str());

    let payload = DispatchPayload {
        report,
        dedupe_key: key,
        attachment: payload_attachment,
        attachment_error,
    };

    let outcome = state.dispatcher.dispatch(&payload).await.inspect_err(|e| {
        warn!(error = %e, "Report dispatch failed");
    })?;

    info!(
        report_type = payload.report.report_type.as_str(),
        source = %payload.report.source,
        has_attachment = payload.attachment.is_some(),
        attachment_failed = payload.attachment_error.is_some(),
        dry_run = outcome.dry_run,
        "Bug report queued"
    );

    Ok(Json(QueuedResponse {
        status: "queued".to_string(),
        dedupe_key: payload.dedupe_key,
        dry_run: outcome.dry_run,
    }))
}

/// Map a body read failure onto the JSON error envelope.
fn body_rejection(rejection: BytesRejection) -> ReportError {
    debug!(error = %rejection, "Rejecting unreadable body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ReportError::PayloadTooLarge
    } else {
        ReportError::InvalidJson
    }
}

/// Parse the request body; an empty body counts as `{}`.
fn parse_body(body: &[u8]) -> Result<Value, ReportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejecting unparsable body");
        ReportError::InvalidJson
    })
}

/// Check the caller's verification token when verification is enabled.
async fn verify_caller(
    state: &AppState,
    incoming: &IncomingReport,
    client: &str,
) -> Result<(), ReportError> {
    let Some(verifier) = &state.verifier else {
        return Ok(());
    };

    let token = incoming
        .verification_token()
        .ok_or(ReportError::MissingVerificationToken)?;

    if state.config.dry_run {
        debug!("Dry run: accepting verification token without checking it");
        return Ok(());
    }

    verifier.verify(token, client).await.map_err(|e| {
        warn!(error = %e, "hCaptcha verification failed");
        ReportError::VerificationFailed
    })
}

/// Derive the client identifier used for verification and rate limiting.
///
/// First hop of `X-Forwarded-For`, else the peer address, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
