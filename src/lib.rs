//! Report Relay - bug report intake for the game website.
//!
//! # Overview
//!
//! Web and game clients submit bug reports over HTTP. The relay checks that
//! the caller is human when hCaptcha is configured and applies a per-client
//! rate limit. It bounds every field and moves small attachments into secret
//! gists. It then forwards the report to GitHub as a `repository_dispatch`
//! event, where a workflow opens the issue.
//!
//! Each report carries a dedupe key, a SHA-256 fingerprint of its title,
//! type, app version and description prefix, so the workflow can spot
//! repeats. The key never blocks a submission.
//!
//! # Modules
//!
//! - [`config`]: Runtime configuration from the environment
//! - [`model`]: Incoming, sanitized and outgoing report types
//! - [`sanitize`]: Field bounds, defaults and the dedupe key
//! - [`rate_limit`]: Sliding-window per-client limiter
//! - [`cors`]: Origin allow-list and CORS headers
//! - [`relay`]: Attachment upload with soft failure
//! - [`upstream`]: hCaptcha, Gist and dispatch clients
//! - [`api`]: HTTP handlers and router
//! - [`error`]: Error taxonomy and HTTP mapping

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod relay;
pub mod sanitize;
pub mod upstream;
