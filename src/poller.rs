//! Timer-driven poll loop.
//!
//! One task owns the write side of the [`StatePublisher`]: each tick it
//! fetches a snapshot, and on success reconciles history, evaluates the
//! alert and commits both as one version. Ticks never overlap; a tick that
//! falls due while a fetch is still outstanding is delayed.

use crate::alert::AlertRule;
use crate::config::MonitorConfig;
use crate::error::{FetchErrorKind, Result};
use crate::fetcher::{HttpFetcher, SnapshotSource};
use crate::health::FeedHealth;
use crate::history::HistoryBuffer;
use crate::logs::LogFeed;
use crate::state::{PresentationState, StatePublisher};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Feed health shared between the poll task and its observers.
#[derive(Debug, Clone, Default)]
pub struct SharedHealth(Arc<Mutex<FeedHealth>>);

impl SharedHealth {
    pub fn new(health: FeedHealth) -> Self {
        Self(Arc::new(Mutex::new(health)))
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> FeedHealth {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedHealth> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new state version was published.
    Committed { version: u64, round: u64 },
    /// Fetch failed; state left untouched.
    Failed(FetchErrorKind),
    /// Fetch succeeded after the publisher was sealed; result dropped.
    Discarded,
}

/// Fetch, reconcile, evaluate, commit.
pub struct Poller<S: SnapshotSource> {
    source: S,
    rule: AlertRule,
    interval: Duration,
    publisher: Arc<StatePublisher>,
    health: SharedHealth,
}

impl Poller<HttpFetcher> {
    /// Poller reading the configured coordinator over HTTP.
    pub fn http(config: &MonitorConfig) -> Result<Self> {
        Self::new(HttpFetcher::new(config)?, config)
    }
}

impl<S: SnapshotSource> Poller<S> {
    /// Create a poller with a fresh, unconnected publisher.
    pub fn new(source: S, config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        let initial = PresentationState::empty(
            HistoryBuffer::new(config.history_capacity),
            LogFeed::new(config.log_capacity),
        );
        Self::with_publisher(source, config, Arc::new(StatePublisher::new(initial)))
    }

    /// Create a poller committing into an existing publisher.
    pub fn with_publisher(
        source: S,
        config: &MonitorConfig,
        publisher: Arc<StatePublisher>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            rule: AlertRule::from_config(config),
            interval: config.poll_interval().max(Duration::from_millis(1)),
            publisher,
            health: SharedHealth::new(FeedHealth::new(config.failure_budget)),
        })
    }

    pub fn publisher(&self) -> Arc<StatePublisher> {
        Arc::clone(&self.publisher)
    }

    pub fn health(&self) -> SharedHealth {
        self.health.clone()
    }

    /// Run one fetch and, on success, commit the reconciled state.
    pub async fn tick(&self) -> TickOutcome {
        let started = Instant::now();
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let kind = self.health.lock().record_failure(&e, Utc::now());
                warn!(
                    kind = kind.as_str(),
                    source = %self.source.describe(),
                    error = %e,
                    "fetch failed, keeping last state"
                );
                return TickOutcome::Failed(kind);
            }
        };

        let was_triggered = self
            .publisher
            .current()
            .alert
            .as_ref()
            .is_some_and(|a| a.triggered);

        let now = Utc::now();
        let Some(state) = self.publisher.apply(&snapshot, &self.rule, now) else {
            debug!(round = snapshot.round, "publisher sealed, snapshot discarded");
            return TickOutcome::Discarded;
        };
        self.health.lock().record_success(started.elapsed(), now);

        if let Some(ref alert) = state.alert {
            match (was_triggered, alert.triggered) {
                (false, true) => warn!(
                    node = %alert.triggering_node,
                    score = alert.score,
                    threshold = alert.threshold,
                    "fairness alert raised, update rejected"
                ),
                (true, false) => info!(node = %alert.triggering_node, "fairness alert cleared"),
                _ => {}
            }
        }
        debug!(
            version = state.version,
            round = snapshot.round,
            history = state.history.len(),
            "state committed"
        );

        TickOutcome::Committed {
            version: state.version,
            round: snapshot.round,
        }
    }

    /// Start the poll loop on the current runtime.
    pub fn spawn(self) -> PollerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let publisher = self.publisher();
        let health = self.health();

        let task = tokio::spawn(self.run(Arc::clone(&running), Arc::clone(&shutdown)));

        PollerHandle {
            running,
            shutdown,
            publisher,
            health,
            task: Some(task),
        }
    }

    async fn run(self, running: Arc<AtomicBool>, shutdown: Arc<Notify>) {
        info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            node = %self.rule.triggering_node,
            threshold = self.rule.threshold,
            "poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                _ = ticker.tick() => {}
            }
            if !running.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    debug!("shutdown during fetch, in-flight request abandoned");
                    break;
                }
                _ = self.tick() => {}
            }
        }

        info!("poller stopped");
    }
}

/// Control handle for a spawned poller.
#[derive(Debug)]
pub struct PollerHandle {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    publisher: Arc<StatePublisher>,
    health: SharedHealth,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Read side of the presentation state.
    pub fn publisher(&self) -> Arc<StatePublisher> {
        Arc::clone(&self.publisher)
    }

    pub fn health(&self) -> FeedHealth {
        self.health.snapshot()
    }

    pub fn shared_health(&self) -> SharedHealth {
        self.health.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop ticking and refuse further commits. Takes effect immediately:
    /// nothing is written to the publisher after this returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.publisher.seal();
        self.shutdown.notify_one();
    }

    /// Stop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    /// A dropped handle stops the loop; the task then exits on its own.
    fn drop(&mut self) {
        self.stop();
    }
}
