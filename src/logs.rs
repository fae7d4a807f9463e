//! Federation log feed.
//!
//! The coordinator returns its whole log on every poll. Only lines beyond
//! the ones already consumed are taken, and each is stamped once, when it
//! first arrives.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of log lines kept.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Marker the coordinator puts in fairness alert lines.
const ALERT_MARKER: &str = "ALERT";

/// A log line with its local arrival time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub line: String,
    pub received_at: DateTime<Utc>,
    pub is_alert: bool,
}

impl LogEntry {
    pub fn new(line: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        let line = line.into();
        let is_alert = line.contains(ALERT_MARKER);
        Self {
            line,
            received_at,
            is_alert,
        }
    }
}

/// Bounded, oldest-first log feed.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFeed {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Upstream lines consumed so far.
    consumed: usize,
}

impl Default for LogFeed {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            consumed: 0,
        }
    }

    /// Take the unseen tail of `upstream`, stamped with `now`. Returns the
    /// number of new lines.
    pub fn ingest(&mut self, upstream: &[String], now: DateTime<Utc>) -> usize {
        if upstream.len() < self.consumed {
            // Shorter than what we already read: the coordinator restarted.
            tracing::info!(
                consumed = self.consumed,
                upstream = upstream.len(),
                "log sequence restarted upstream"
            );
            self.consumed = 0;
        }

        let fresh = &upstream[self.consumed..];
        for line in fresh {
            self.entries.push_back(LogEntry::new(line.as_str(), now));
        }
        self.consumed = upstream.len();

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        fresh.len()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries newest first, the order a log panel shows them.
    pub fn newest_first(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn alert_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_alert).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
