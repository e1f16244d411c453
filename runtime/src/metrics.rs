//! Prometheus metrics for transactions and allocation outcomes.
//!
//! Metric families:
//! - Record store transactions (commits, conflicts, exhausted retry budgets)
//! - Seat registrations by outcome
//! - Wishlist changes by operation
//! - Filter compilation by outcome
//!
//! # Example
//!
//! ```rust,no_run
//! use conference_central_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Installs the global recorder and serves `/metrics` over HTTP for scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and spawn the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built (for example the address is
    /// in use) or a different recorder is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;

        tokio::spawn(async move {
            // ExporterError implements neither Debug nor Display.
            if exporter.await.is_err() {
                tracing::error!("Metrics exporter stopped");
            }
        });

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        self.handle = Some(handle);
        Ok(())
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "store_transactions_committed_total",
        "Transactions that committed"
    );
    describe_counter!(
        "store_transaction_conflicts_total",
        "Commit attempts rejected by optimistic concurrency control"
    );
    describe_counter!(
        "store_transactions_exhausted_total",
        "Transactions abandoned after exhausting the retry budget"
    );
    describe_histogram!(
        "store_transaction_duration_seconds",
        "Time from first attempt to successful commit"
    );

    describe_counter!(
        "conference_registrations_total",
        "Seat registration requests by outcome"
    );
    describe_counter!(
        "conference_wishlist_changes_total",
        "Wishlist additions and removals"
    );
    describe_counter!(
        "conference_filters_compiled_total",
        "Conference query filter sets by compile outcome"
    );
}

/// Transaction metrics recorder.
pub struct TransactionMetrics;

impl TransactionMetrics {
    /// Record a successful commit.
    pub fn record_commit(duration: Duration) {
        counter!("store_transactions_committed_total").increment(1);
        histogram!("store_transaction_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a commit conflict.
    pub fn record_conflict() {
        counter!("store_transaction_conflicts_total").increment(1);
    }

    /// Record a transaction that ran out of retries.
    pub fn record_exhausted() {
        counter!("store_transactions_exhausted_total").increment(1);
    }
}

/// Allocation metrics recorder.
pub struct AllocationMetrics;

impl AllocationMetrics {
    /// Record a registration or cancellation outcome (`registered`, `cancelled`,
    /// `not_registered`, `rejected`).
    pub fn record_registration(outcome: &'static str) {
        counter!("conference_registrations_total", "outcome" => outcome).increment(1);
    }

    /// Record a wishlist change (`add` or `remove`).
    pub fn record_wishlist_change(operation: &'static str) {
        counter!("conference_wishlist_changes_total", "op" => operation).increment(1);
    }
}

/// Filter compiler metrics recorder.
pub struct FilterMetrics;

impl FilterMetrics {
    /// Record a compile outcome (`ok` or `invalid`).
    pub fn record_compile(outcome: &'static str) {
        counter!("conference_filters_compiled_total", "outcome" => outcome).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.render().is_none());
    }

    #[test]
    fn test_recorders_without_installed_recorder_are_noops() {
        register_metrics();
        TransactionMetrics::record_commit(Duration::from_millis(3));
        TransactionMetrics::record_conflict();
        TransactionMetrics::record_exhausted();
        AllocationMetrics::record_registration("registered");
        AllocationMetrics::record_wishlist_change("add");
        FilterMetrics::record_compile("ok");
    }
}
