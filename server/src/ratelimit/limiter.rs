//! Core rate limiter service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use textline_common::Identity;
use tracing::{debug, info};

use crate::ratelimit::{LimitConfig, RateDecision, RateLimitConfig, RateLimitWindow};

/// Timestamps of admitted requests for one identity, oldest first.
#[derive(Debug, Default)]
struct WindowState {
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
}

/// Per-identity sliding-window rate limiter.
///
/// Each identity owns two independent windows. The check, purge and record
/// steps for one identity run under that identity's map entry, so concurrent
/// admissions for the same sender cannot undercount.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    windows: Arc<DashMap<Identity, WindowState>>,
}

impl RateLimiter {
    /// Creates a new rate limiter instance.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Checks and records a request for `identity` at the current time.
    pub fn check(&self, identity: &Identity) -> RateDecision {
        self.admit(identity, Instant::now())
    }

    /// Checks and records a request for `identity` at `now`.
    ///
    /// Entries older than each window are purged before evaluating. When a
    /// window is already at capacity the request is denied and neither window
    /// is touched; otherwise `now` is recorded in both.
    #[tracing::instrument(skip(self, identity, now), fields(identity = %identity.masked()))]
    pub fn admit(&self, identity: &Identity, now: Instant) -> RateDecision {
        if !self.config.enabled {
            return RateDecision::Allowed;
        }

        if self.is_allowed_by_config(identity) {
            debug!("Identity in allowlist, bypassing rate limit");
            return RateDecision::Allowed;
        }

        let limits = &self.config.limits;
        let mut state = self.windows.entry(identity.clone()).or_default();

        purge(&mut state.minute, now, limits.per_minute);
        purge(&mut state.hour, now, limits.per_hour);

        if let Some(retry_after) = at_capacity(&state.minute, now, limits.per_minute) {
            debug!(
                window = %RateLimitWindow::Minute,
                current_count = state.minute.len(),
                limit = limits.per_minute.requests,
                "Rate limit exceeded"
            );
            return RateDecision::Denied {
                window: RateLimitWindow::Minute,
                retry_after,
            };
        }

        if let Some(retry_after) = at_capacity(&state.hour, now, limits.per_hour) {
            debug!(
                window = %RateLimitWindow::Hour,
                current_count = state.hour.len(),
                limit = limits.per_hour.requests,
                "Rate limit exceeded"
            );
            return RateDecision::Denied {
                window: RateLimitWindow::Hour,
                retry_after,
            };
        }

        state.minute.push_back(now);
        state.hour.push_back(now);
        RateDecision::Allowed
    }

    /// Checks if the identity is in the allowlist configuration.
    pub fn is_allowed_by_config(&self, identity: &Identity) -> bool {
        self.config.allowlist.contains(identity)
    }

    /// Drops identities whose windows hold no live entries at `now`.
    ///
    /// Returns the number of identities removed.
    pub fn cleanup(&self, now: Instant) -> usize {
        let limits = self.config.limits.clone();
        let before = self.windows.len();
        self.windows.retain(|_, state| {
            purge(&mut state.minute, now, limits.per_minute);
            purge(&mut state.hour, now, limits.per_hour);
            !state.minute.is_empty() || !state.hour.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Start a background task that runs [`RateLimiter::cleanup`] every `period`.
    pub fn spawn_cleanup_task(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // consume immediate first tick
            loop {
                interval.tick().await;
                let removed = limiter.cleanup(Instant::now());
                if removed > 0 {
                    info!(removed, "Rate limiter state cleaned up");
                }
            }
        })
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}

/// Removes entries older than the window relative to `now`.
fn purge(window: &mut VecDeque<Instant>, now: Instant, limit: LimitConfig) {
    let span = Duration::from_secs(limit.window_secs);
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) > span {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Returns the retry hint when the (already purged) window is full.
fn at_capacity(window: &VecDeque<Instant>, now: Instant, limit: LimitConfig) -> Option<Duration> {
    if window.len() < limit.requests as usize {
        return None;
    }
    let span = Duration::from_secs(limit.window_secs);
    let age = window
        .front()
        .map(|&oldest| now.saturating_duration_since(oldest))
        .unwrap_or_default();
    Some(span.saturating_sub(age))
}
