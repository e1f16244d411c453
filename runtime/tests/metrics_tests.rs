//! Tests for the Prometheus exporter.
//!
//! Installing the exporter sets the process-wide recorder, so this file holds a single test.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use conference_central_runtime::metrics::{
    AllocationMetrics, MetricsError, MetricsServer, TransactionMetrics,
};
use std::time::Duration;

#[tokio::test]
async fn started_server_renders_recorded_metrics() {
    let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
    server.start().unwrap();

    TransactionMetrics::record_commit(Duration::from_millis(4));
    TransactionMetrics::record_conflict();
    AllocationMetrics::record_registration("registered");

    let rendered = server.render().unwrap();
    assert!(rendered.contains("store_transactions_committed_total 1"));
    assert!(rendered.contains("store_transaction_conflicts_total 1"));
    assert!(rendered.contains("conference_registrations_total{outcome=\"registered\"} 1"));

    // The exporter task keeps running after start returns.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut second = MetricsServer::new("127.0.0.1:0".parse().unwrap());
    assert!(matches!(second.start(), Err(MetricsError::Install(_))));
    assert!(second.render().is_none());
}
