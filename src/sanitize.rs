//! Sanitation of untrusted reports and dedupe-key computation.
//!
//! Field coercion follows the loose rules browsers and game clients expect:
//! strings pass through, numbers and `true` are stringified, and `null`,
//! `false`, `0`, arrays and objects count as absent. All caps are measured in
//! characters, after trimming.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ReportError;
use crate::model::{IncomingReport, ReportType, SanitizedAttachment, SanitizedReport};

pub const MAX_TITLE: usize = 120;
pub const MAX_DESCRIPTION: usize = 10_000;
pub const MAX_LOGS: usize = 20_000;
pub const MAX_EMAIL: usize = 320;
pub const MAX_SOURCE: usize = 32;
pub const MAX_VERSION: usize = 64;
pub const MAX_OS: usize = 128;
pub const MAX_FILENAME: usize = 255;
pub const MAX_MIME_TYPE: usize = 100;

/// Largest attachment accepted for relay, in bytes (500 KiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 500 * 1024;

/// Number of description characters that feed the dedupe key.
const DEDUPE_DESCRIPTION_CHARS: usize = 200;

const DEFAULT_SOURCE: &str = "web";
const DEFAULT_FILENAME: &str = "attachment.txt";

/// Sanitize a report and enforce the required fields.
///
/// # Errors
///
/// Returns [`ReportError::MissingRequiredFields`] when title or description is
/// empty once trimmed and truncated.
pub fn sanitize(input: &IncomingReport) -> Result<SanitizedReport, ReportError> {
    let report = sanitize_fields(input);
    if report.title.is_empty() || report.description.is_empty() {
        return Err(ReportError::MissingRequiredFields);
    }
    Ok(report)
}

/// Coerce every field into its bounded form without checking required fields.
pub fn sanitize_fields(input: &IncomingReport) -> SanitizedReport {
    let report_type = text(&input.report_type)
        .map(|t| ReportType::parse_lenient(&t))
        .unwrap_or_default();

    let source = text(&input.source)
        .map(|s| truncate(&s.to_lowercase(), MAX_SOURCE))
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

    SanitizedReport {
        title: trimmed(&input.title, MAX_TITLE),
        description: trimmed(&input.description, MAX_DESCRIPTION),
        report_type,
        email: trimmed(&input.email, MAX_EMAIL),
        source,
        app_version: trimmed(&input.app_version, MAX_VERSION),
        build_id: trimmed(&input.build_id, MAX_VERSION),
        os: trimmed(&input.os, MAX_OS),
        // Logs keep their leading/trailing whitespace; indentation matters.
        logs: text(&input.logs)
            .map(|l| truncate(&l, MAX_LOGS))
            .unwrap_or_default(),
        notify: truthy(&input.notify),
        attachment: sanitize_attachment(&input.attachment),
    }
}

/// Keep an attachment only if it has content and fits the size cap.
fn sanitize_attachment(value: &Value) -> Option<SanitizedAttachment> {
    let object = value.as_object()?;
    let empty = Value::Null;
    let field = |name: &str| object.get(name).unwrap_or(&empty);

    let content = text(field("content"))?;
    // Line breaks in wrapped base64 do not count towards its length.
    let encoded_len = content
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .count() as u64;
    let size = field("size")
        .as_u64()
        .or_else(|| field("size").as_f64().map(|s| s.max(0.0) as u64))
        .unwrap_or(encoded_len);

    if size > MAX_ATTACHMENT_BYTES || encoded_len > max_encoded_len() {
        return None;
    }

    let filename = trimmed(field("filename"), MAX_FILENAME);
    Some(SanitizedAttachment {
        filename: if filename.is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            filename
        },
        content,
        size,
        mime_type: trimmed(field("type"), MAX_MIME_TYPE),
    })
}

/// Base64 length of an attachment at the size cap.
const fn max_encoded_len() -> u64 {
    MAX_ATTACHMENT_BYTES.div_ceil(3) * 4
}

/// Compute the dedupe key for a sanitized report.
///
/// SHA-256 over title, type, app version and the first 200 characters of the
/// description, as 64 lower-case hex characters.
pub fn dedupe_key(report: &SanitizedReport) -> String {
    let description: String = report
        .description
        .chars()
        .take(DEDUPE_DESCRIPTION_CHARS)
        .collect();
    let material = format!(
        "{}|{}|{}|{}",
        report.title,
        report.report_type.as_str(),
        report.app_version,
        description
    );
    let hash = Sha256::digest(material.as_bytes());
    format!("{hash:x}")
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn trimmed(value: &Value, max_chars: usize) -> String {
    text(value)
        .map(|s| truncate(s.trim(), max_chars))
        .unwrap_or_default()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
