//! Detached background monitoring for escalated transactions
//!
//! Once the foreground budget is spent the original caller has already been
//! answered, so there is no result channel back. Logging and metrics are the
//! only failure-reporting surface here.

use super::{InFlightRegistry, RetryBudget};
use crate::engine::{EngineApi, QueueId, RecoveryDriver, TxStatus};
use crate::metrics;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spawn a fire-and-forget monitor task owning `queue_id`
pub fn spawn_monitor(
    engine: Arc<dyn EngineApi>,
    queue_id: QueueId,
    budget: RetryBudget,
    registry: Arc<InFlightRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(monitor(engine, queue_id, budget, registry))
}

async fn monitor(
    engine: Arc<dyn EngineApi>,
    queue_id: QueueId,
    budget: RetryBudget,
    registry: Arc<InFlightRegistry>,
) {
    for retry in 0..budget.max_background_retries {
        match engine.status(&queue_id).await {
            Ok(observed) => match observed.status {
                TxStatus::Mined => {
                    info!(queue_id = %queue_id, "Background-monitored transaction mined");
                    metrics::record_tx_mined("background");
                    registry.resolve(&queue_id);
                    return;
                }
                TxStatus::Cancelled => {
                    error!(queue_id = %queue_id, "Background-monitored transaction cancelled");
                    metrics::record_tx_cancelled("background");
                    registry.resolve(&queue_id);
                    return;
                }
                TxStatus::Errored => {
                    warn!(
                        queue_id = %queue_id,
                        attempt = retry + 1,
                        max = budget.max_background_retries,
                        "Retrying errored transaction in background"
                    );
                    match RecoveryDriver::new(engine.as_ref()).recover(&queue_id).await {
                        Ok(()) => metrics::record_recovery_attempt("background"),
                        Err(e) => {
                            warn!(queue_id = %queue_id, "Background recovery request failed: {}", e)
                        }
                    }
                }
                TxStatus::Submitted => {}
            },
            Err(e) => {
                warn!(queue_id = %queue_id, "Background status poll failed: {}", e);
            }
        }

        tokio::time::sleep(budget.background_retry_interval).await;
    }

    error!(
        queue_id = %queue_id,
        retries = budget.max_background_retries,
        "Transaction did not resolve within the background budget, abandoning"
    );
    metrics::record_tx_unresolved();
    registry.resolve(&queue_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngineApi, StatusResult};
    use serde_json::json;

    fn polled(status: TxStatus) -> StatusResult {
        StatusResult {
            status,
            raw: json!({}),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_errored_recovers_once_per_iteration_then_stops() {
        let retries = 4;
        let mut engine = MockEngineApi::new();
        engine
            .expect_status()
            .times(retries as usize)
            .returning(|_| Ok(polled(TxStatus::Errored)));
        engine
            .expect_retry_failed()
            .times(retries as usize)
            .returning(|_| Ok(()));
        engine
            .expect_sync_retry()
            .times(retries as usize)
            .returning(|_| Ok(()));

        let budget = RetryBudget {
            max_background_retries: retries,
            ..RetryBudget::default()
        };
        let handle = spawn_monitor(
            Arc::new(engine),
            QueueId("q1".into()),
            budget,
            Arc::new(InFlightRegistry::new()),
        );
        // Exhausting the budget must not panic or propagate anything
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_mined_without_recovery() {
        let mut engine = MockEngineApi::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(polled(TxStatus::Submitted)));
        engine
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(polled(TxStatus::Mined)));
        engine.expect_retry_failed().never();
        engine.expect_sync_retry().never();

        let handle = spawn_monitor(
            Arc::new(engine),
            QueueId("q1".into()),
            RetryBudget::default(),
            Arc::new(InFlightRegistry::new()),
        );
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_stops_the_monitor() {
        let mut engine = MockEngineApi::new();
        engine
            .expect_status()
            .times(1)
            .returning(|_| Ok(polled(TxStatus::Cancelled)));
        engine.expect_retry_failed().never();
        engine.expect_sync_retry().never();

        let registry = Arc::new(InFlightRegistry::new());
        let handle = spawn_monitor(
            Arc::new(engine),
            QueueId("q1".into()),
            RetryBudget::default(),
            registry.clone(),
        );
        handle.await.unwrap();
        assert_eq!(registry.total(), 0);
    }
}
