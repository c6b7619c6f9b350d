//! hCaptcha siteverify client.
//!
//! Exchanges a client-supplied token for a pass/fail verdict. One request per
//! submission; failures are never retried.
//!
//! # API Reference
//!
//! See: <https://docs.hcaptcha.com/#verify-the-user-response-server-side>

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_HCAPTCHA_VERIFY_URL;

/// Reasons a token was not accepted.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The verification service could not be reached or returned garbage.
    #[error("verification request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The verification service answered with a non-success status.
    #[error("verification service returned status {0}")]
    Status(u16),

    /// The service processed the token and rejected it.
    #[error("token rejected: {}", .0.join(", "))]
    Rejected(Vec<String>),
}

/// Client for the hCaptcha verification endpoint.
#[derive(Clone)]
pub struct HCaptchaClient {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl HCaptchaClient {
    /// Create a client against the public hCaptcha endpoint.
    pub fn new(secret: String) -> Self {
        Self::with_verify_url(DEFAULT_HCAPTCHA_VERIFY_URL, secret)
    }

    /// Create a client with a custom verification URL (for testing).
    pub fn with_verify_url(verify_url: &str, secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url: verify_url.to_string(),
            secret,
        }
    }

    /// Verify `token` for a caller at `remote_ip`.
    ///
    /// `remote_ip` is omitted from the request when it is `"unknown"`.
    ///
    /// # Errors
    ///
    /// Any transport error, non-2xx status, unparsable body or
    /// `success != true` verdict.
    pub async fn verify(&self, token: &str, remote_ip: &str) -> Result<(), VerificationError> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if remote_ip != "unknown" {
            form.push(("remoteip", remote_ip));
        }

        let response = self.client.post(&self.verify_url).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(VerificationError::Status(response.status().as_u16()));
        }

        let verdict = response.json::<SiteVerifyResponse>().await?;
        if verdict.success {
            Ok(())
        } else {
            Err(VerificationError::Rejected(verdict.error_codes))
        }
    }
}

/// Response body of the siteverify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,

    /// hCaptcha error codes, e.g. `invalid-input-response`.
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}
