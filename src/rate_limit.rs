//! Per-client rate limiting for report submissions.
//!
//! A sliding-window limiter held in process memory. Each key maps to the
//! timestamps of its accepted requests inside the trailing window; rejected
//! requests are not recorded.
//!
//! Limits are per instance only. Several relay processes behind a load
//! balancer each enforce the limit on their own, so the effective fleet-wide
//! limit is `max_requests * instances`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};

use crate::error::ReportError;

/// Longest accepted window, one day.
pub const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Configuration for the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of accepted requests per key in the window.
    pub max_requests: u32,

    /// Size of the sliding window in seconds, clamped to [`MAX_WINDOW_SECS`].
    pub window_secs: u64,

    /// Sweep keys with no recent requests every N checks.
    pub cleanup_interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            cleanup_interval: 100,
        }
    }
}

/// An in-memory sliding-window rate limiter keyed by client identifier.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
    checks: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    /// The key used for report submissions from `client`.
    pub fn report_key(client: &str) -> String {
        format!("report:{client}")
    }

    /// Check and record a request for `key` at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::RateLimited`] if the key already has
    /// `max_requests` accepted requests inside the window.
    pub fn check(&self, key: &str) -> Result<(), ReportError> {
        self.check_at(key, Utc::now())
    }

    /// Check and record a request for `key` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::RateLimited`] when over the limit.
    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<(), ReportError> {
        let cutoff = self.cutoff(now);

        let count = self.checks.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval.max(1) == 0 {
            tracing::debug!(check_count = count, "Sweeping expired rate limit windows");
            self.cleanup_at(now);
        }

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let timestamps = windows.entry(key.to_string()).or_default();
        timestamps.retain(|&t| t > cutoff);

        if timestamps.len() >= self.config.max_requests as usize {
            tracing::warn!(
                requests = timestamps.len(),
                max = self.config.max_requests,
                "Rate limit exceeded"
            );
            return Err(ReportError::RateLimited);
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drop keys whose every timestamp has left the window.
    pub fn cleanup_at(&self, now: DateTime<Utc>) {
        let cutoff = self.cutoff(now);
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        windows.retain(|_, timestamps| {
            timestamps.retain(|&t| t > cutoff);
            !timestamps.is_empty()
        });
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Oldest timestamp still inside the window ending at `now`.
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.config.window_secs.min(MAX_WINDOW_SECS);
        let window = Duration::seconds(i64::try_from(secs).unwrap_or(0));
        now.checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
