//! CORS policy for the report endpoint.
//!
//! The allow-list accepts literal origins and wildcard patterns such as
//! `https://*.netlify.app`. A `*` inside a pattern matches any run of
//! characters within one host label or path segment, so it never spans a
//! `.` or `/`. A bare `*` entry allows every origin.

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::AppState;

const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const MAX_AGE_SECS: &str = "86400";

/// Parsed origin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// Parse a comma- and/or whitespace-separated list of origins.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The `Access-Control-Allow-Origin` value for a request from `origin`.
    ///
    /// - no allow-list: echo the caller, or `*` without an `Origin` header
    /// - `*` listed: `*`
    /// - matching literal or pattern: echo the caller
    /// - otherwise: the first configured origin
    pub fn allow_origin(&self, origin: Option<&str>) -> String {
        let origin = origin.filter(|o| !o.is_empty());

        let Some(first) = self.entries.first() else {
            return origin.unwrap_or("*").to_string();
        };

        if self.entries.iter().any(|e| e == "*") {
            return "*".to_string();
        }

        match origin {
            Some(origin) if self.entries.iter().any(|e| origin_matches(e, origin)) => {
                origin.to_string()
            }
            _ => first.clone(),
        }
    }
}

/// Match `origin` against a literal or wildcard allow-list entry.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    if !pattern.contains('*') {
        return pattern.eq_ignore_ascii_case(origin);
    }
    wildcard_match(
        pattern.to_ascii_lowercase().as_bytes(),
        origin.to_ascii_lowercase().as_bytes(),
    )
}

fn wildcard_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            // `*` consumes zero or more bytes but stops at a separator
            let mut i = 0;
            loop {
                if wildcard_match(rest, &text[i..]) {
                    return true;
                }
                match text.get(i) {
                    Some(b'.' | b'/') | None => return false,
                    Some(_) => i += 1,
                }
            }
        }
        Some((p, rest)) => match text.split_first() {
            Some((t, text_rest)) if t == p => wildcard_match(rest, text_rest),
            _ => false,
        },
    }
}

/// Attach the CORS headers to `headers` for a request from `origin`.
pub fn apply_headers(headers: &mut HeaderMap, allow_list: &AllowList, origin: Option<&str>) {
    let allow = allow_list.allow_origin(origin);
    let allow = HeaderValue::from_str(&allow).unwrap_or_else(|_| HeaderValue::from_static("*"));

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow);
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
    headers.insert(VARY, HeaderValue::from_static("Origin"));
}

/// Middleware adding CORS headers to every response, errors included.
pub async fn cors_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = next.run(request).await;
    apply_headers(
        response.headers_mut(),
        &state.config.allowed_origins,
        origin.as_deref(),
    );
    response
}
