//! Error types for BiasGuard
//!
//! Fetch errors never stop the poll loop: they are logged
//! and the tick is skipped. Monitor errors come from setup (configuration,
//! HTTP client construction) and are returned to the caller.

use thiserror::Error;

/// Result type alias for BiasGuard setup operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised while building or configuring the monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors during a single fetch of the coordinator snapshot
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection refused, timeout, DNS failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("Protocol error: HTTP {status}")]
    Protocol { status: u16 },

    /// Body is not a snapshot-shaped JSON document
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body decoded but violates snapshot invariants
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Coarse classification of a fetch failure, used as a log field and metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Network,
    Protocol,
    Decode,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Protocol => "protocol",
            FetchErrorKind::Decode => "decode",
        }
    }
}

impl FetchError {
    /// Classify this error. Invalid snapshots count as decode failures.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Protocol { .. } => FetchErrorKind::Protocol,
            FetchError::Decode(_) | FetchError::InvalidSnapshot(_) => FetchErrorKind::Decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Protocol { status: 503 };
        let msg = format!("{}", err);
        assert!(msg.contains("Protocol"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_decode_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: FetchError = json_err.into();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(err.kind(), FetchErrorKind::Decode);
    }

    #[test]
    fn test_invalid_snapshot_is_decode_kind() {
        let err = FetchError::InvalidSnapshot("accuracy out of range".to_string());
        assert_eq!(err.kind(), FetchErrorKind::Decode);
        assert_eq!(err.kind().as_str(), "decode");
    }

    #[test]
    fn test_monitor_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }
}
