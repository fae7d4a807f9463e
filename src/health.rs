//! Feed health for the coordinator connection
//!
//! Tracked separately from the presentation state, which must stay
//! untouched when a poll fails.

use crate::error::{FetchError, FetchErrorKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Health status of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Last poll succeeded
    Healthy,
    /// Serving stale data, still within the failure budget
    Degraded,
    /// Failure budget exhausted, or never connected after failures
    Unhealthy,
    /// No poll has completed yet
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Check if the status is operational (healthy or degraded)
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    /// Check if the status is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Process-level feed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    /// No successful poll yet
    #[default]
    Connecting,
    /// Last poll succeeded
    Live,
    /// Had data once, last poll failed; last good state retained
    Stale,
}

/// Last fetch failure, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub kind: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Running counters for the poll loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedHealth {
    pub phase: FeedPhase,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub failure_budget: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_latency_ms: u64,
    pub last_error: Option<FailureRecord>,
    /// Failure counts keyed by [`FetchErrorKind::as_str`]
    pub failures_by_kind: BTreeMap<&'static str, u64>,
}

impl Default for FeedHealth {
    fn default() -> Self {
        Self::new(5)
    }
}

impl FeedHealth {
    /// Create a tracker tolerating `failure_budget` consecutive failures
    pub fn new(failure_budget: u32) -> Self {
        Self {
            phase: FeedPhase::Connecting,
            successes: 0,
            failures: 0,
            consecutive_failures: 0,
            failure_budget,
            last_success: None,
            last_latency_ms: 0,
            last_error: None,
            failures_by_kind: BTreeMap::new(),
        }
    }

    /// Record a committed poll
    pub fn record_success(&mut self, latency: Duration, at: DateTime<Utc>) {
        self.phase = FeedPhase::Live;
        self.successes += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(at);
        self.last_latency_ms = latency.as_millis() as u64;
    }

    /// Record a skipped tick
    pub fn record_failure(&mut self, error: &FetchError, at: DateTime<Utc>) -> FetchErrorKind {
        let kind = error.kind();
        if self.phase == FeedPhase::Live {
            self.phase = FeedPhase::Stale;
        }
        self.failures += 1;
        *self.failures_by_kind.entry(kind.as_str()).or_insert(0) += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(FailureRecord {
            kind: kind.as_str(),
            message: error.to_string(),
            at,
        });
        kind
    }

    /// Current status derived from phase and failure streak
    pub fn status(&self) -> HealthStatus {
        match self.phase {
            FeedPhase::Live => HealthStatus::Healthy,
            FeedPhase::Stale if self.consecutive_failures <= self.failure_budget => {
                HealthStatus::Degraded
            }
            FeedPhase::Stale => HealthStatus::Unhealthy,
            FeedPhase::Connecting if self.failures == 0 => HealthStatus::Unknown,
            FeedPhase::Connecting => HealthStatus::Unhealthy,
        }
    }

    /// Whether a state has ever been committed
    pub fn has_data(&self) -> bool {
        self.phase != FeedPhase::Connecting
    }

    /// Generate health report
    pub fn report(&self) -> String {
        let mut report = format!(
            "Feed Status: {:?} ({:?})\nPolls: {} ok, {} failed, {} in a row\n",
            self.status(),
            self.phase,
            self.successes,
            self.failures,
            self.consecutive_failures
        );
        if let Some(ref err) = self.last_error {
            report.push_str(&format!("Last error [{}]: {}\n", err.kind, err.message));
        }
        report
    }
}
