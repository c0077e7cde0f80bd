//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Engine submissions by operation kind
//! - Confirmation outcomes per supervision phase
//! - Recovery attempts, escalations, and abandoned transactions
//! - Orchestrated purchase attempts

use crate::error::RelayResult;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Submission metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "backbeat_tx_submitted_total",
        "Total engine submissions by operation kind",
        &["operation"]
    ).unwrap();

    // Confirmation metrics, labelled by supervision phase
    pub static ref TX_MINED: CounterVec = register_counter_vec!(
        "backbeat_tx_mined_total",
        "Total transactions confirmed mined",
        &["phase"]
    ).unwrap();

    pub static ref TX_CANCELLED: CounterVec = register_counter_vec!(
        "backbeat_tx_cancelled_total",
        "Total transactions cancelled by the engine",
        &["phase"]
    ).unwrap();

    pub static ref TX_RECOVERY_ATTEMPTS: CounterVec = register_counter_vec!(
        "backbeat_tx_recovery_attempts_total",
        "Total engine recovery round-trips for errored transactions",
        &["phase"]
    ).unwrap();

    pub static ref TX_ESCALATED: Counter = register_counter!(
        "backbeat_tx_escalated_total",
        "Transactions handed to the background monitor"
    ).unwrap();

    pub static ref TX_UNRESOLVED: Counter = register_counter!(
        "backbeat_tx_unresolved_total",
        "Transactions abandoned after the background budget"
    ).unwrap();

    pub static ref CONFIRMATION_LATENCY: Histogram = register_histogram!(
        "backbeat_confirmation_latency_seconds",
        "Foreground time from first poll to mined",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // Purchase orchestration metrics
    pub static ref PURCHASE_ATTEMPTS: Counter = register_counter!(
        "backbeat_purchase_attempts_total",
        "Total orchestrated purchase attempts"
    ).unwrap();

    pub static ref PURCHASES_COMPLETED: Counter = register_counter!(
        "backbeat_purchases_completed_total",
        "Orchestrated purchases that completed"
    ).unwrap();

    pub static ref PURCHASES_FAILED: Counter = register_counter!(
        "backbeat_purchases_failed_total",
        "Orchestrated purchases that exhausted all attempts"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> RelayResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::error::RelayError::Internal(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| crate::error::RelayError::Internal(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

// Helper functions to record metrics

pub fn record_tx_submitted(operation: &str) {
    TX_SUBMITTED.with_label_values(&[operation]).inc();
}

pub fn record_tx_mined(phase: &str) {
    TX_MINED.with_label_values(&[phase]).inc();
}

pub fn record_tx_cancelled(phase: &str) {
    TX_CANCELLED.with_label_values(&[phase]).inc();
}

pub fn record_recovery_attempt(phase: &str) {
    TX_RECOVERY_ATTEMPTS.with_label_values(&[phase]).inc();
}

pub fn record_escalation() {
    TX_ESCALATED.inc();
}

pub fn record_tx_unresolved() {
    TX_UNRESOLVED.inc();
}

pub fn record_confirmation_latency(latency_secs: f64) {
    CONFIRMATION_LATENCY.observe(latency_secs);
}

pub fn record_purchase_attempt() {
    PURCHASE_ATTEMPTS.inc();
}

pub fn record_purchase_completed() {
    PURCHASES_COMPLETED.inc();
}

pub fn record_purchase_failed() {
    PURCHASES_FAILED.inc();
}
