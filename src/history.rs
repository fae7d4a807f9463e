//! Bounded accuracy-over-round history.
//!
//! The buffer only guards against consecutive duplicate rounds; it does not
//! assume rounds arrive in increasing order.

use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of points kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// Source round number.
    pub round: u64,
    /// Display label, `"R" + round`.
    pub round_label: String,
    /// Accuracy percentage with one decimal.
    pub accuracy: f64,
}

impl HistoryPoint {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            round: snapshot.round,
            round_label: format!("R{}", snapshot.round),
            accuracy: snapshot.accuracy_percent(),
        }
    }
}

/// Sliding window of history points, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Merge a snapshot in place. Returns false when the snapshot repeats
    /// the last recorded round and the buffer was left untouched.
    pub fn push_snapshot(&mut self, snapshot: &Snapshot) -> bool {
        if self.last_round() == Some(snapshot.round) {
            return false;
        }

        self.points.push_back(HistoryPoint::from_snapshot(snapshot));
        self.prune();
        true
    }

    /// Round of the newest point.
    pub fn last_round(&self) -> Option<u64> {
        self.points.back().map(|p| p.round)
    }

    pub fn points(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Points as a contiguous vector, oldest first.
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn prune(&mut self) {
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }
}

/// Produce the buffer that results from merging `snapshot` into `history`.
pub fn reconcile(history: &HistoryBuffer, snapshot: &Snapshot) -> HistoryBuffer {
    let mut next = history.clone();
    next.push_snapshot(snapshot);
    next
}
