//! Coordinator snapshot: one polled reading of the aggregation service.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One reading of the coordinator's `/metrics` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregation round counter.
    pub round: u64,
    /// Global model accuracy in `[0, 1]`.
    pub accuracy: f64,
    /// Per-client demographic parity score.
    pub clients: BTreeMap<String, f64>,
    /// Federation log, append-only upstream, newest last.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl Snapshot {
    /// Build a snapshot without logs.
    pub fn new(round: u64, accuracy: f64) -> Self {
        Self {
            round,
            accuracy,
            clients: BTreeMap::new(),
            logs: Vec::new(),
        }
    }

    /// Add a client score.
    pub fn with_client(mut self, name: impl Into<String>, bias_score: f64) -> Self {
        self.clients.insert(name.into(), bias_score);
        self
    }

    /// Append a log line.
    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }

    /// Decode and validate a response body.
    pub fn from_json(body: &[u8]) -> Result<Self, FetchError> {
        let snapshot: Self = serde_json::from_slice(body)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject values the coordinator can never legitimately send.
    pub fn validate(&self) -> Result<(), FetchError> {
        if !self.accuracy.is_finite() || !(0.0..=1.0).contains(&self.accuracy) {
            return Err(FetchError::InvalidSnapshot(format!(
                "accuracy {} outside [0, 1]",
                self.accuracy
            )));
        }
        for (client, score) in &self.clients {
            if !score.is_finite() || *score < 0.0 {
                return Err(FetchError::InvalidSnapshot(format!(
                    "bias score {} for {:?} is not a non-negative number",
                    score, client
                )));
            }
        }
        Ok(())
    }

    /// Bias score reported for a client, if any.
    pub fn bias_score(&self, client: &str) -> Option<f64> {
        self.clients.get(client).copied()
    }

    /// Accuracy as a percentage rounded to one decimal.
    pub fn accuracy_percent(&self) -> f64 {
        (self.accuracy * 1000.0).round() / 10.0
    }

    /// Client with the highest bias score. Ties resolve to the first name in order.
    pub fn worst_client(&self) -> Option<(&str, f64)> {
        self.clients
            .iter()
            .fold(None, |worst: Option<(&str, f64)>, (name, &score)| match worst {
                Some((_, best)) if best >= score => worst,
                _ => Some((name.as_str(), score)),
            })
    }
}
