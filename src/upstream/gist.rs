//! GitHub Gist client used to store report attachments.
//!
//! Attachments are uploaded as a single-file secret gist; the report only
//! carries the gist URL.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::USER_AGENT;
use crate::config::DEFAULT_GITHUB_API_URL;

/// Reasons an attachment could not be stored.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No token is configured for the paste store.
    #[error("attachment store not configured")]
    NotConfigured,

    /// The attachment content is not valid base64.
    #[error("attachment is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The store could not be reached or returned garbage.
    #[error("attachment upload failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("attachment upload failed: {status} {body}")]
    Status { status: u16, body: String },

    /// The store accepted the upload but returned no URL.
    #[error("attachment upload returned no URL")]
    MissingUrl,
}

/// Client for creating gists.
#[derive(Clone)]
pub struct GistClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GistClient {
    /// Create a client against the public GitHub API.
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_GITHUB_API_URL, token)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Upload `content` as a secret gist and return its HTML URL.
    ///
    /// # Errors
    ///
    /// [`RelayError::NotConfigured`] without a token; otherwise any transport
    /// error, non-2xx status or missing `html_url`.
    pub async fn create_secret_gist(
        &self,
        description: &str,
        filename: &str,
        content: String,
    ) -> Result<String, RelayError> {
        let token = self.token.as_deref().ok_or(RelayError::NotConfigured)?;

        let request = CreateGistRequest {
            description: description.to_string(),
            public: false,
            files: HashMap::from([(filename.to_string(), GistFile { content })]),
        };

        let response = self
            .client
            .post(format!("{}/gists", self.base_url))
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created = response.json::<CreateGistResponse>().await?;
        created.html_url.ok_or(RelayError::MissingUrl)
    }
}

/// Request body for `POST /gists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGistRequest {
    pub description: String,
    pub public: bool,
    pub files: HashMap<String, GistFile>,
}

/// A single gist file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistFile {
    pub content: String,
}

/// The part of the `POST /gists` response the relay uses.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGistResponse {
    #[serde(default)]
    pub html_url: Option<String>,
}
