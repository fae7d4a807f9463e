//! Fairness alert derived from a single snapshot.

use crate::config::{MonitorConfig, DEFAULT_BIAS_THRESHOLD, DEFAULT_TRIGGERING_NODE};
use crate::snapshot::Snapshot;
use serde::Serialize;

/// Fixed rule: one named node, one threshold, strict greater-than.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub triggering_node: String,
    pub threshold: f64,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            triggering_node: DEFAULT_TRIGGERING_NODE.to_string(),
            threshold: DEFAULT_BIAS_THRESHOLD,
        }
    }
}

impl AlertRule {
    pub fn new(triggering_node: impl Into<String>, threshold: f64) -> Self {
        Self {
            triggering_node: triggering_node.into(),
            threshold,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.triggering_node.clone(), config.bias_threshold)
    }

    /// Whether a score breaches this rule.
    pub fn exceeds(&self, score: f64) -> bool {
        score > self.threshold
    }

    /// Evaluate a snapshot. A node missing from `clients` scores zero.
    pub fn evaluate(&self, snapshot: &Snapshot) -> AlertState {
        let reported = snapshot.bias_score(&self.triggering_node);
        if reported.is_none() {
            tracing::debug!(
                node = %self.triggering_node,
                round = snapshot.round,
                "triggering node missing from snapshot"
            );
        }
        let score = reported.unwrap_or(0.0);

        AlertState {
            triggered: self.exceeds(score),
            triggering_node: self.triggering_node.clone(),
            score,
            threshold: self.threshold,
            node_reported: reported.is_some(),
        }
    }
}

/// What the coordinator does with the triggering node's update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateVerdict {
    Accepted,
    Rejected,
}

impl UpdateVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateVerdict::Accepted => "ACCEPTED",
            UpdateVerdict::Rejected => "REJECTED",
        }
    }
}

/// Alert detail record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertState {
    pub triggered: bool,
    pub triggering_node: String,
    pub score: f64,
    pub threshold: f64,
    /// False when the node was absent and `score` is the zero fallback.
    pub node_reported: bool,
}

impl AlertState {
    pub fn verdict(&self) -> UpdateVerdict {
        if self.triggered {
            UpdateVerdict::Rejected
        } else {
            UpdateVerdict::Accepted
        }
    }
}

/// Evaluate with the default rule.
pub fn evaluate(snapshot: &Snapshot) -> AlertState {
    AlertRule::default().evaluate(snapshot)
}
