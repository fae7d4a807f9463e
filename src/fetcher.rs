//! Snapshot sources.
//!
//! [`HttpFetcher`] reads the coordinator over HTTP; anything else that can
//! produce snapshots (a recorded session, a test script) implements
//! [`SnapshotSource`] and plugs into the same poller.

use crate::config::MonitorConfig;
use crate::error::{FetchError, MonitorError, Result};
use crate::snapshot::Snapshot;
use std::future::Future;

/// Something the poller can read one snapshot from per tick.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = std::result::Result<Snapshot, FetchError>> + Send;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// `GET <endpoint>/metrics` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    /// Build a fetcher for the configured endpoint.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(MonitorError::HttpClient)?;
        Ok(Self {
            client,
            url: config.metrics_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpFetcher {
    async fn fetch(&self) -> std::result::Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(FetchError::Network)?;
        Snapshot::from_json(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_uses_metrics_path() {
        let fetcher = HttpFetcher::new(&MonitorConfig::with_endpoint("http://10.1.2.3:8000")).unwrap();
        assert_eq!(fetcher.url(), "http://10.1.2.3:8000/metrics");
        assert_eq!(fetcher.describe(), "http://10.1.2.3:8000/metrics");
    }

    #[test]
    fn test_fetcher_rejects_invalid_config() {
        let config = MonitorConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            HttpFetcher::new(&config),
            Err(MonitorError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Reserve a port, then release it so nothing is listening there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = MonitorConfig {
            endpoint: format!("http://127.0.0.1:{}", port),
            request_timeout_ms: 1000,
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
