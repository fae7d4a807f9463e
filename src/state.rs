//! Presentation state and its single-writer publisher.
//!
//! Every successful poll produces a new immutable [`PresentationState`]
//! version. Readers hold an `Arc` to a whole version, so history, alert and
//! logs are always observed together.

use crate::alert::{AlertRule, AlertState, UpdateVerdict};
use crate::history::{HistoryBuffer, HistoryPoint};
use crate::logs::{LogEntry, LogFeed};
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Reconciled state consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationState {
    /// Latest accepted snapshot, absent before the first successful poll.
    pub snapshot: Option<Snapshot>,
    pub history: HistoryBuffer,
    pub alert: Option<AlertState>,
    pub logs: LogFeed,
    /// Number of commits so far.
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::empty(HistoryBuffer::default(), LogFeed::default())
    }
}

impl PresentationState {
    /// The "not yet connected" state.
    pub fn empty(history: HistoryBuffer, logs: LogFeed) -> Self {
        Self {
            snapshot: None,
            history,
            alert: None,
            logs,
            version: 0,
            updated_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The next version after merging `snapshot`. Pure: `self` is not touched.
    pub fn advance(&self, snapshot: &Snapshot, rule: &AlertRule, now: DateTime<Utc>) -> Self {
        let mut history = self.history.clone();
        history.push_snapshot(snapshot);

        let mut logs = self.logs.clone();
        logs.ingest(&snapshot.logs, now);

        Self {
            snapshot: Some(snapshot.clone()),
            history,
            alert: Some(rule.evaluate(snapshot)),
            logs,
            version: self.version + 1,
            updated_at: Some(now),
        }
    }

    /// Serializable view for the rendering layer.
    pub fn view(&self) -> PresentationView {
        let (Some(snapshot), Some(alert)) = (&self.snapshot, &self.alert) else {
            return PresentationView::connecting(self.version);
        };

        let threshold_rule = AlertRule::new(alert.triggering_node.clone(), alert.threshold);
        let clients = snapshot
            .clients
            .iter()
            .map(|(name, &score)| ClientView {
                name: name.clone(),
                bias_score: score,
                exceeds_threshold: threshold_rule.exceeds(score),
            })
            .collect();

        PresentationView {
            phase: Phase::Live,
            version: self.version,
            round: Some(snapshot.round),
            accuracy_percent: Some(snapshot.accuracy_percent()),
            clients,
            worst_client: snapshot.worst_client().map(|(name, _)| name.to_string()),
            history: self.history.to_vec(),
            alert: Some(AlertView {
                verdict: alert.verdict(),
                state: alert.clone(),
            }),
            logs: self.logs.newest_first().cloned().collect(),
            updated_at: self.updated_at,
        }
    }
}

/// Connection phase as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientView {
    pub name: String,
    pub bias_score: f64,
    pub exceeds_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub state: AlertState,
    pub verdict: UpdateVerdict,
}

/// JSON-ready projection of a [`PresentationState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationView {
    pub phase: Phase,
    pub version: u64,
    pub round: Option<u64>,
    pub accuracy_percent: Option<f64>,
    pub clients: Vec<ClientView>,
    pub worst_client: Option<String>,
    pub history: Vec<HistoryPoint>,
    pub alert: Option<AlertView>,
    /// Newest first.
    pub logs: Vec<LogEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PresentationView {
    fn connecting(version: u64) -> Self {
        Self {
            phase: Phase::Connecting,
            version,
            round: None,
            accuracy_percent: None,
            clients: Vec::new(),
            worst_client: None,
            history: Vec::new(),
            alert: None,
            logs: Vec::new(),
            updated_at: None,
        }
    }
}

/// Holds the current state and serializes commits.
#[derive(Debug)]
pub struct StatePublisher {
    tx: watch::Sender<Arc<PresentationState>>,
    /// Set once sealed; held for the whole commit so no write can follow a seal.
    sealed: Mutex<bool>,
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new(PresentationState::default())
    }
}

impl StatePublisher {
    pub fn new(initial: PresentationState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            sealed: Mutex::new(false),
        }
    }

    /// Latest committed state.
    pub fn current(&self) -> Arc<PresentationState> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every commit.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PresentationState>> {
        self.tx.subscribe()
    }

    /// Merge a snapshot and publish the result as one version. Returns
    /// `None` once the publisher is sealed.
    pub fn apply(
        &self,
        snapshot: &Snapshot,
        rule: &AlertRule,
        now: DateTime<Utc>,
    ) -> Option<Arc<PresentationState>> {
        let sealed = self.sealed.lock().unwrap_or_else(PoisonError::into_inner);
        if *sealed {
            return None;
        }

        let next = Arc::new(self.current().advance(snapshot, rule, now));
        self.tx.send_replace(Arc::clone(&next));
        Some(next)
    }

    /// Refuse all further commits.
    pub fn seal(&self) {
        *self.sealed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn is_sealed(&self) -> bool {
        *self.sealed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn round(round: u64, accuracy: f64, b: f64) -> Snapshot {
        Snapshot::new(round, accuracy)
            .with_client("Hospital A", 0.02)
            .with_client("Hospital B", b)
    }

    #[test]
    fn test_starts_unconnected() {
        let publisher = StatePublisher::default();
        let state = publisher.current();
        assert!(!state.is_live());
        assert!(state.alert.is_none());
        assert_eq!(state.view().phase, Phase::Connecting);
    }

    #[test]
    fn test_apply_commits_history_and_alert_together() {
        let publisher = StatePublisher::default();
        let rule = AlertRule::default();

        publisher.apply(&round(1, 0.92, 0.03), &rule, now()).unwrap();
        let state = publisher
            .apply(&round(2, 0.90, 0.21), &rule, now())
            .unwrap();

        assert_eq!(state.version, 2);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history.last_round(), Some(2));
        let alert = state.alert.as_ref().unwrap();
        assert!(alert.triggered);
        assert_eq!(alert.score, 0.21);
        assert_eq!(publisher.current(), state);
    }

    #[test]
    fn test_readers_keep_their_version() {
        let publisher = StatePublisher::default();
        let rule = AlertRule::default();
        publisher.apply(&round(1, 0.92, 0.03), &rule, now());
        let held = publisher.current();

        publisher.apply(&round(2, 0.90, 0.21), &rule, now());
        assert_eq!(held.history.len(), 1);
        assert!(!held.alert.as_ref().unwrap().triggered);
    }

    #[test]
    fn test_sealed_publisher_rejects_commits() {
        let publisher = StatePublisher::default();
        publisher.seal();
        assert!(publisher.is_sealed());
        assert!(publisher
            .apply(&round(1, 0.92, 0.03), &AlertRule::default(), now())
            .is_none());
        assert_eq!(publisher.current().version, 0);
    }

    #[test]
    fn test_subscribers_see_commits() {
        let publisher = StatePublisher::default();
        let mut rx = publisher.subscribe();
        publisher.apply(&round(1, 0.92, 0.03), &AlertRule::default(), now());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().version, 1);
    }

    #[test]
    fn test_view_live() {
        let state = PresentationState::default().advance(
            &round(2, 0.90, 0.21).with_log("ALERT: Hospital B Bias Score 0.21 exceeds threshold!"),
            &AlertRule::default(),
            now(),
        );
        let view = state.view();

        assert_eq!(view.phase, Phase::Live);
        assert_eq!(view.round, Some(2));
        assert_eq!(view.accuracy_percent, Some(90.0));
        assert_eq!(view.worst_client.as_deref(), Some("Hospital B"));
        assert!(view.clients.iter().any(|c| c.name == "Hospital B" && c.exceeds_threshold));
        assert!(view.clients.iter().any(|c| c.name == "Hospital A" && !c.exceeds_threshold));
        assert_eq!(view.alert.as_ref().unwrap().verdict, UpdateVerdict::Rejected);
        assert_eq!(view.logs.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "live");
        assert_eq!(json["alert"]["triggered"], true);
        assert_eq!(json["alert"]["verdict"], "rejected");
        assert_eq!(json["history"][0]["round_label"], "R2");
    }
}
