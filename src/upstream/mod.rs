//! Clients for the services a report passes through.
//!
//! - [`hcaptcha`]: human verification of the submitting client
//! - [`gist`]: secret gists holding report attachments
//! - [`github`]: `repository_dispatch` events that become issues

pub mod gist;
pub mod github;
pub mod hcaptcha;

pub use gist::GistClient;
pub use github::Dispatcher;
pub use hcaptcha::HCaptchaClient;

/// User agent sent to the GitHub API, which rejects requests without one.
pub(crate) const USER_AGENT: &str = "report-relay";
