//! Runtime configuration.
//!
//! Built once at start-up from the environment and shared with handlers
//! behind an `Arc`. Empty variables count as unset.

use std::env;

use crate::cors::AllowList;
use crate::rate_limit::{MAX_WINDOW_SECS, RateLimitConfig};

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 8888;

/// Default GitHub REST API base.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default hCaptcha verification endpoint.
pub const DEFAULT_HCAPTCHA_VERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";

/// hCaptcha credentials. Verification is only enabled when both are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub site_key: String,
    pub secret: String,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub port: u16,

    /// Token used for `repository_dispatch` (`GITHUB_DISPATCH_TOKEN`).
    pub dispatch_token: Option<String>,

    /// Dispatch target in `owner/name` form (`GITHUB_REPO`).
    pub dispatch_repo: Option<String>,

    /// CORS allow-list (`ALLOWED_ORIGIN`).
    pub allowed_origins: AllowList,

    /// Skip all outbound network calls (`DRY_RUN`).
    ///
    /// Any non-empty value enables it except `0`, `false`, `no` and `off`
    /// (case-insensitive), which keep the relay live.
    pub dry_run: bool,

    /// hCaptcha settings; `None` disables verification.
    pub verification: Option<VerificationConfig>,

    /// Token for creating attachment gists (`GIST_TOKEN`, else the dispatch token).
    pub gist_token: Option<String>,

    /// GitHub API base URL (`GITHUB_API_URL`).
    pub github_api_url: String,

    /// hCaptcha verification endpoint (`HCAPTCHA_VERIFY_URL`).
    pub hcaptcha_verify_url: String,

    /// Per-client submission limit.
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dispatch_token: None,
            dispatch_repo: None,
            allowed_origins: AllowList::default(),
            dry_run: false,
            verification: None,
            gist_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            hcaptcha_verify_url: DEFAULT_HCAPTCHA_VERIFY_URL.to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        let default_limit = RateLimitConfig::default();

        let dispatch_token = var("GITHUB_DISPATCH_TOKEN");
        let verification = match (var("HCAPTCHA_SITEKEY"), var("HCAPTCHA_SECRET")) {
            (Some(site_key), Some(secret)) => Some(VerificationConfig { site_key, secret }),
            _ => None,
        };

        Self {
            port: var("REPORT_RELAY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            gist_token: var("GIST_TOKEN").or_else(|| dispatch_token.clone()),
            dispatch_token,
            dispatch_repo: var("GITHUB_REPO"),
            allowed_origins: var("ALLOWED_ORIGIN")
                .map(|raw| AllowList::parse(&raw))
                .unwrap_or_default(),
            dry_run: var("DRY_RUN").is_some_and(|v| flag_enabled(&v)),
            verification,
            github_api_url: var("GITHUB_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.github_api_url),
            hcaptcha_verify_url: var("HCAPTCHA_VERIFY_URL").unwrap_or(defaults.hcaptcha_verify_url),
            rate_limit: RateLimitConfig {
                max_requests: var("REPORT_RATE_LIMIT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default_limit.max_requests),
                window_secs: var("REPORT_RATE_WINDOW_SECS")
                    .and_then(|v| v.parse().ok())
                    .filter(|&secs| secs > 0)
                    .map(|secs: u64| secs.min(MAX_WINDOW_SECS))
                    .unwrap_or(default_limit.window_secs),
                ..default_limit
            },
        }
    }

    /// Whether submissions must carry a verification token.
    pub fn verification_enabled(&self) -> bool {
        self.verification.is_some()
    }
}

fn flag_enabled(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
