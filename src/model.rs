//! Data models for the report relay.
//!
//! Reports arrive as loosely-typed JSON ([`IncomingReport`]) and leave as a
//! bounded, trusted shape ([`SanitizedReport`]) wrapped in a
//! [`DispatchPayload`]. Only the payload is ever sent upstream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untrusted report body as submitted by web and game clients.
///
/// Every field is kept as a raw JSON value so that a client sending a number
/// where a string is expected still gets a best-effort report through.
#[derive(Debug, Clone, Default)]
pub struct IncomingReport {
    pub title: Value,
    pub description: Value,
    pub report_type: Value,
    pub email: Value,
    pub source: Value,
    pub app_version: Value,
    pub build_id: Value,
    pub os: Value,
    pub logs: Value,
    pub notify: Value,
    pub attachment: Value,

    /// Human-verification token. The hCaptcha widget's own field names are
    /// accepted as well.
    pub verification_token: Value,
}

/// Body keys that may carry the verification token, highest priority first.
const TOKEN_FIELDS: [&str; 3] = ["verificationToken", "h-captcha-response", "hcaptchaToken"];

impl IncomingReport {
    /// Interpret an already-parsed JSON body.
    ///
    /// Bodies that are valid JSON but not an object yield an empty report,
    /// which is later rejected for missing fields.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let mut take = |key: &str| map.remove(key).unwrap_or(Value::Null);

        let mut tokens = TOKEN_FIELDS.map(&mut take).into_iter();
        let verification_token = tokens
            .find(|v| v.as_str().is_some_and(|t| !t.trim().is_empty()))
            .unwrap_or(Value::Null);

        Self {
            title: take("title"),
            description: take("description"),
            report_type: take("type"),
            email: take("email"),
            source: take("source"),
            app_version: take("appVersion"),
            build_id: take("buildId"),
            os: take("os"),
            logs: take("logs"),
            notify: take("notify"),
            attachment: take("attachment"),
            verification_token,
        }
    }

    /// The verification token, if one was supplied and is not blank.
    pub fn verification_token(&self) -> Option<&str> {
        self.verification_token
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// The kinds of report the issue tracker knows how to label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Bug,
    Feature,
    Documentation,
    Performance,
}

impl ReportType {
    /// Parse a case-insensitive report type, falling back to [`ReportType::Bug`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "feature" => ReportType::Feature,
            "documentation" => ReportType::Documentation,
            "performance" => ReportType::Performance,
            _ => ReportType::Bug,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Bug => "bug",
            ReportType::Feature => "feature",
            ReportType::Documentation => "documentation",
            ReportType::Performance => "performance",
        }
    }
}

/// A bounded attachment that survived sanitation.
///
/// The base64 content is held only until the relay step; it is never
/// serialized into the dispatch payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedAttachment {
    pub filename: String,
    pub content: String,
    pub size: u64,
    pub mime_type: String,
}

/// A report whose fields have been coerced, trimmed and length-capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedReport {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub email: String,
    pub source: String,
    pub app_version: String,
    pub build_id: String,
    pub os: String,
    pub logs: String,
    pub notify: bool,

    #[serde(skip)]
    pub attachment: Option<SanitizedAttachment>,
}

/// Reference to attachment content stored outside the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Where the uploaded content can be viewed.
    pub url: String,
    /// The filename the client submitted.
    pub filename: String,
    /// The size the client declared, in bytes.
    pub size: u64,
}

/// The `client_payload` forwarded to the dispatch endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
    #[serde(flatten)]
    pub report: SanitizedReport,

    pub dedupe_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,

    /// Set when the attachment could not be relayed; the report is still sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_error: Option<String>,
}

/// Response for a successfully accepted report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    pub status: String,
    pub dedupe_key: String,
    pub dry_run: bool,
}

/// Response for the liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessResponse {
    pub status: String,
    pub dry_run: bool,
}
