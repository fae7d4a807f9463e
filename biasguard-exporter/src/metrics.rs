// BiasGuard Exporter - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for BiasGuard monitoring.
//!
//! Gauges are refreshed from the latest committed presentation state and
//! feed health on every scrape, so they never run ahead of what the state
//! endpoint reports.

use biasguard::{FeedHealth, HealthStatus, PresentationState};
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_gauge_vec, register_int_counter_vec, Encoder, Gauge, GaugeVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ============================================================
    // Coordinator Metrics (from the latest snapshot)
    // ============================================================

    /// Latest aggregation round.
    pub static ref ROUND: Gauge = register_gauge!(
        "biasguard_round",
        "Latest aggregation round reported by the coordinator"
    ).unwrap();

    /// Global model accuracy, percent with one decimal.
    pub static ref ACCURACY_PERCENT: Gauge = register_gauge!(
        "biasguard_accuracy_percent",
        "Global model accuracy in percent"
    ).unwrap();

    /// Per-client demographic parity score (labeled by client name).
    pub static ref CLIENT_BIAS_SCORE: GaugeVec = register_gauge_vec!(
        "biasguard_client_bias_score",
        "Per-client demographic parity score",
        &["client"]
    ).unwrap();

    // ============================================================
    // Alert Metrics
    // ============================================================

    /// Whether the fairness alert is raised (1 = triggered, 0 = balanced).
    pub static ref FAIRNESS_ALERT: Gauge = register_gauge!(
        "biasguard_fairness_alert",
        "Fairness alert state (1=triggered, 0=balanced)"
    ).unwrap();

    /// Threshold the triggering node is compared against.
    pub static ref BIAS_THRESHOLD: Gauge = register_gauge!(
        "biasguard_bias_threshold",
        "Bias threshold of the fairness alert rule"
    ).unwrap();

    // ============================================================
    // Monitor Metrics
    // ============================================================

    /// Points currently in the accuracy history.
    pub static ref HISTORY_POINTS: Gauge = register_gauge!(
        "biasguard_history_points",
        "Points in the accuracy history window"
    ).unwrap();

    /// Committed state versions.
    pub static ref STATE_VERSION: Gauge = register_gauge!(
        "biasguard_state_version",
        "Number of committed presentation state versions"
    ).unwrap();

    /// Polls by outcome (success / failure).
    pub static ref POLLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "biasguard_polls_total",
        "Polls of the coordinator by outcome",
        &["outcome"]
    ).unwrap();

    /// Fetch failures by kind (network / protocol / decode).
    pub static ref FETCH_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "biasguard_fetch_failures_total",
        "Failed fetches by error kind",
        &["kind"]
    ).unwrap();

    /// Current failure streak.
    pub static ref CONSECUTIVE_FAILURES: Gauge = register_gauge!(
        "biasguard_consecutive_failures",
        "Consecutive failed polls"
    ).unwrap();

    /// Feed status (0=Healthy, 1=Degraded, 2=Unhealthy, 3=Unknown).
    pub static ref FEED_STATUS: Gauge = register_gauge!(
        "biasguard_feed_status",
        "Feed status (0=Healthy, 1=Degraded, 2=Unhealthy, 3=Unknown)"
    ).unwrap();
}

/// Numeric code for a feed status.
pub fn status_code(status: HealthStatus) -> f64 {
    match status {
        HealthStatus::Healthy => 0.0,
        HealthStatus::Degraded => 1.0,
        HealthStatus::Unhealthy => 2.0,
        HealthStatus::Unknown => 3.0,
    }
}

/// Update coordinator and alert gauges from a committed state.
pub fn update_state_metrics(state: &PresentationState) {
    HISTORY_POINTS.set(state.history.len() as f64);
    STATE_VERSION.set(state.version as f64);

    let Some(ref snapshot) = state.snapshot else {
        return;
    };
    ROUND.set(snapshot.round as f64);
    ACCURACY_PERCENT.set(snapshot.accuracy_percent());

    // Clients may leave the federation; drop stale label sets
    CLIENT_BIAS_SCORE.reset();
    for (client, score) in &snapshot.clients {
        CLIENT_BIAS_SCORE.with_label_values(&[client.as_str()]).set(*score);
    }

    if let Some(ref alert) = state.alert {
        FAIRNESS_ALERT.set(if alert.triggered { 1.0 } else { 0.0 });
        BIAS_THRESHOLD.set(alert.threshold);
    }
}

/// Advance a counter to `total`, never backwards.
fn catch_up(counter: &IntCounter, total: u64) {
    let seen = counter.get();
    if total > seen {
        counter.inc_by(total - seen);
    }
}

/// Update poll counters from feed health.
pub fn update_health_metrics(health: &FeedHealth) {
    catch_up(&POLLS_TOTAL.with_label_values(&["success"]), health.successes);
    catch_up(&POLLS_TOTAL.with_label_values(&["failure"]), health.failures);
    for (kind, count) in &health.failures_by_kind {
        catch_up(&FETCH_FAILURES_TOTAL.with_label_values(&[*kind]), *count);
    }
    CONSECUTIVE_FAILURES.set(health.consecutive_failures as f64);
    FEED_STATUS.set(status_code(health.status()));
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biasguard::{AlertRule, FetchError, Snapshot};
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(HealthStatus::Healthy), 0.0);
        assert_eq!(status_code(HealthStatus::Degraded), 1.0);
        assert_eq!(status_code(HealthStatus::Unhealthy), 2.0);
        assert_eq!(status_code(HealthStatus::Unknown), 3.0);
    }

    #[test]
    fn test_encode_metrics() {
        let state = PresentationState::default().advance(
            &Snapshot::new(2, 0.9)
                .with_client("Hospital A", 0.02)
                .with_client("Hospital B", 0.21),
            &AlertRule::default(),
            Utc::now(),
        );
        update_state_metrics(&state);

        let mut health = FeedHealth::default();
        health.record_success(Duration::from_millis(3), Utc::now());
        health.record_failure(&FetchError::Protocol { status: 500 }, Utc::now());
        update_health_metrics(&health);

        // Scraping the same counts twice must not double them
        update_health_metrics(&health);

        let output = encode_metrics().unwrap();
        assert!(output.contains("# TYPE biasguard_polls_total counter"));
        assert!(output.contains("# TYPE biasguard_fetch_failures_total counter"));
        assert!(output.contains("biasguard_round 2"));
        assert!(output.contains("biasguard_fairness_alert 1"));
        assert!(output.contains("biasguard_client_bias_score{client=\"Hospital B\"} 0.21"));
        assert!(output.contains("biasguard_fetch_failures_total{kind=\"protocol\"} 1"));
        assert!(output.contains("biasguard_polls_total{outcome=\"success\"} 1"));
    }
}
