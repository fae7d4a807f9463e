//! # BiasGuard - Federated learning fairness monitor
//!
//! Polls a federated-learning coordinator, keeps a bounded accuracy history,
//! raises a fairness alert when a configured node's bias score crosses a
//! threshold, and publishes the reconciled state to a rendering layer.
//!
//! ## Key Features
//!
//! - **Fixed-cadence polling**: one outstanding request at a time, failures skip the tick
//! - **History reconciliation**: bounded window, consecutive duplicate rounds ignored
//! - **Fairness alert**: strict threshold rule on a single configured node
//! - **Atomic publication**: readers always see history, alert and logs from the same poll
//!
//! ## Quick Start
//!
//! ```rust
//! use biasguard::{AlertRule, HistoryBuffer, Snapshot, reconcile};
//!
//! let snapshot = Snapshot::new(2, 0.90)
//!     .with_client("Hospital A", 0.02)
//!     .with_client("Hospital B", 0.21);
//!
//! let history = reconcile(&HistoryBuffer::default(), &snapshot);
//! assert_eq!(history.to_vec()[0].round_label, "R2");
//!
//! let alert = AlertRule::default().evaluate(&snapshot);
//! assert!(alert.triggered);
//! ```
//!
//! Running against a live coordinator:
//!
//! ```no_run
//! use biasguard::{MonitorConfig, Poller};
//!
//! # async fn run() -> biasguard::Result<()> {
//! let handle = Poller::http(&MonitorConfig::default())?.spawn();
//! let state = handle.publisher().current();
//! println!("live: {}", state.is_live());
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`snapshot`]: Coordinator wire format and validation
//! - [`history`]: Bounded accuracy history and reconciliation
//! - [`alert`]: Fairness alert rule and verdict
//! - [`logs`]: Federation log feed with arrival timestamps
//! - [`state`]: Presentation state and publisher
//! - [`fetcher`]: Snapshot sources (HTTP)
//! - [`poller`]: Timer-driven pipeline task
//! - [`health`]: Feed health tracking

// Modules
pub mod alert;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod health;
pub mod history;
pub mod logs;
pub mod poller;
pub mod snapshot;
pub mod state;

// Re-exports for convenient access
pub use alert::{evaluate, AlertRule, AlertState, UpdateVerdict};
pub use config::MonitorConfig;
pub use error::{FetchError, FetchErrorKind, MonitorError, Result};
pub use fetcher::{HttpFetcher, SnapshotSource};
pub use health::{FeedHealth, FeedPhase, HealthStatus};
pub use history::{reconcile, HistoryBuffer, HistoryPoint};
pub use logs::{LogEntry, LogFeed};
pub use poller::{Poller, PollerHandle, SharedHealth, TickOutcome};
pub use snapshot::Snapshot;
pub use state::{Phase, PresentationState, PresentationView, StatePublisher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
