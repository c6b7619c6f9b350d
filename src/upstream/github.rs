//! GitHub `repository_dispatch` client.
//!
//! Reports are not turned into issues here. They are sent as a
//! `bug-report` dispatch event and a workflow in the target repository
//! creates the issue.
//!
//! # API Reference
//!
//! See: <https://docs.github.com/en/rest/repos/repos#create-a-repository-dispatch-event>

use serde::Serialize;
use tracing::info;

use super::USER_AGENT;
use crate::config::DEFAULT_GITHUB_API_URL;
use crate::error::ReportError;
use crate::model::DispatchPayload;

/// Event type the issue workflow listens for.
pub const EVENT_TYPE: &str = "bug-report";

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// True when no network call was made.
    pub dry_run: bool,
}

/// Forwards reports to a repository as dispatch events.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    repo: Option<String>,
    dry_run: bool,
}

impl Dispatcher {
    /// Create a dispatcher against the public GitHub API.
    pub fn new(token: Option<String>, repo: Option<String>, dry_run: bool) -> Self {
        Self::with_base_url(DEFAULT_GITHUB_API_URL, token, repo, dry_run)
    }

    /// Create a dispatcher with a custom base URL (for testing).
    pub fn with_base_url(
        base_url: &str,
        token: Option<String>,
        repo: Option<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            repo,
            dry_run,
        }
    }

    /// Send `payload` as a `bug-report` dispatch event.
    ///
    /// # Errors
    ///
    /// - [`ReportError::NotConfigured`] if the token or repository is missing
    ///   or the repository is not `owner/name`
    /// - [`ReportError::UpstreamDispatchFailed`] on transport errors or a
    ///   non-2xx response
    pub async fn dispatch(&self, payload: &DispatchPayload) -> Result<DispatchOutcome, ReportError> {
        if self.dry_run {
            info!(dedupe_key = %payload.dedupe_key, "Dry run: skipping dispatch");
            return Ok(DispatchOutcome { dry_run: true });
        }

        let url = self.dispatch_url()?;
        let token = self.token.as_deref().ok_or_else(not_configured)?;

        let body = DispatchRequest {
            event_type: EVENT_TYPE,
            client_payload: payload,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::UpstreamDispatchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::UpstreamDispatchFailed(format!(
                "{} {}",
                status.as_u16(),
                text
            )));
        }

        Ok(DispatchOutcome { dry_run: false })
    }

    /// The dispatches URL for the configured repository.
    fn dispatch_url(&self) -> Result<String, ReportError> {
        let repo = self.repo.as_deref().ok_or_else(not_configured)?;
        let (owner, name) = repo
            .split_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| {
                ReportError::NotConfigured(format!("GITHUB_REPO must be owner/name, got {repo:?}"))
            })?;

        Ok(format!(
            "{}/repos/{}/{}/dispatches",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        ))
    }
}

fn not_configured() -> ReportError {
    ReportError::NotConfigured("missing GITHUB_DISPATCH_TOKEN or GITHUB_REPO".to_string())
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    event_type: &'static str,
    client_payload: &'a DispatchPayload,
}
