//! Foreground confirmation state machine
//!
//! Drives one tracked transaction from submission to a terminal state under a
//! bounded budget. Every poll iteration consumes the immediate-retry counter;
//! an `errored` observation additionally consumes the error-retry counter.
//! When the immediate budget runs out without resolution, ownership of the
//! queue id moves into a detached background monitor and the caller gets
//! control back at once.

use super::background;
use super::{InFlightRegistry, RetryBudget, Supervision, SupervisionPhase};
use crate::engine::{EngineApi, QueueId, RecoveryDriver, TxStatus};
use crate::error::{RelayError, RelayResult};
use crate::metrics;

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Local supervision record for one submitted transaction.
///
/// Owned exclusively by the supervising task; the engine remains the source
/// of truth for status, which is re-derived on every poll.
#[derive(Debug)]
pub struct TrackedTransaction {
    pub queue_id: QueueId,
    pub status: Option<TxStatus>,
    /// Last status seen, used only to suppress duplicate transition logs
    last_observed: Option<TxStatus>,
    pub error_retries: u32,
}

impl TrackedTransaction {
    pub fn new(queue_id: QueueId) -> Self {
        Self {
            queue_id,
            status: None,
            last_observed: None,
            error_retries: 0,
        }
    }

    /// Record a polled status, logging only actual transitions
    fn observe(&mut self, status: TxStatus) {
        self.status = Some(status);
        if self.last_observed != Some(status) {
            info!(
                queue_id = %self.queue_id,
                status = status.as_str(),
                "Transaction status"
            );
            self.last_observed = Some(status);
        }
    }
}

/// Drives tracked transactions to a terminal state
pub struct ConfirmationSupervisor {
    engine: Arc<dyn EngineApi>,
    budget: RetryBudget,
    registry: Arc<InFlightRegistry>,
}

impl ConfirmationSupervisor {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        budget: RetryBudget,
        registry: Arc<InFlightRegistry>,
    ) -> Self {
        Self {
            engine,
            budget,
            registry,
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Supervise a submitted transaction until it is mined, fails terminally,
    /// or the foreground budget is exhausted and supervision escalates to the
    /// background monitor.
    pub async fn ensure_mined(&self, queue_id: QueueId) -> RelayResult<Supervision> {
        let started = Instant::now();
        let mut tx = TrackedTransaction::new(queue_id);
        self.registry
            .track(tx.queue_id.clone(), SupervisionPhase::Foreground);

        for _ in 0..self.budget.max_immediate_retries {
            match self.engine.status(&tx.queue_id).await {
                Ok(observed) => {
                    tx.observe(observed.status);
                    match observed.status {
                        TxStatus::Mined => {
                            info!(queue_id = %tx.queue_id, "Transaction mined");
                            metrics::record_tx_mined("foreground");
                            metrics::record_confirmation_latency(started.elapsed().as_secs_f64());
                            self.registry.resolve(&tx.queue_id);
                            return Ok(Supervision::Mined);
                        }
                        TxStatus::Cancelled => {
                            error!(queue_id = %tx.queue_id, "Transaction cancelled by engine");
                            metrics::record_tx_cancelled("foreground");
                            self.registry.resolve(&tx.queue_id);
                            return Err(RelayError::Cancelled {
                                queue_id: tx.queue_id.to_string(),
                            });
                        }
                        TxStatus::Errored => {
                            if tx.error_retries >= self.budget.max_error_retries {
                                error!(
                                    queue_id = %tx.queue_id,
                                    retries = tx.error_retries,
                                    "Transaction failed after max recovery attempts, restart required"
                                );
                                self.registry.resolve(&tx.queue_id);
                                return Err(RelayError::EngineErrored {
                                    queue_id: tx.queue_id.to_string(),
                                });
                            }
                            warn!(
                                queue_id = %tx.queue_id,
                                attempt = tx.error_retries + 1,
                                max = self.budget.max_error_retries,
                                "Transaction errored, requesting engine recovery"
                            );
                            match RecoveryDriver::new(self.engine.as_ref())
                                .recover(&tx.queue_id)
                                .await
                            {
                                Ok(()) => {
                                    tx.error_retries += 1;
                                    metrics::record_recovery_attempt("foreground");
                                }
                                Err(e) => {
                                    warn!(
                                        queue_id = %tx.queue_id,
                                        "Recovery request failed: {}", e
                                    );
                                }
                            }
                        }
                        TxStatus::Submitted => {}
                    }
                }
                Err(e) => {
                    warn!(queue_id = %tx.queue_id, "Status poll failed: {}", e);
                }
            }

            tokio::time::sleep(self.budget.retry_interval).await;
        }

        // Foreground budget spent without a terminal state. Hand the queue id
        // to the background monitor and return control to the caller; this
        // supervisor must not poll it again.
        warn!(
            queue_id = %tx.queue_id,
            "Foreground budget exhausted, moving transaction to background monitoring"
        );
        metrics::record_escalation();
        self.registry
            .track(tx.queue_id.clone(), SupervisionPhase::Background);
        let handle = background::spawn_monitor(
            self.engine.clone(),
            tx.queue_id,
            self.budget.clone(),
            self.registry.clone(),
        );

        Ok(Supervision::EscalatedToBackground(handle))
    }
}
