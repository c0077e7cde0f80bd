//! Multi-step purchase orchestration
//!
//! Sequences dependent on-chain operations where each step is its own tracked
//! transaction. A step's transaction must be confirmed mined before the next
//! step is submitted; real assets move here, and submitting a purchase before
//! its allowance is confirmed would spend one without the other.
//!
//! On any step failure the whole sequence restarts from step one. There is no
//! partial resume: intermediate on-chain state such as an already-granted
//! allowance is overwritten by re-submission.

use crate::config::PurchaseConfig;
use crate::engine::QueueId;
use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::supervisor::{ConfirmationSupervisor, Supervision};

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

type SubmitFn = Box<dyn Fn() -> BoxFuture<'static, RelayResult<QueueId>> + Send + Sync>;

/// One named sub-operation of an orchestrated purchase. The submit closure is
/// re-invoked on every attempt, so it must capture everything it needs by
/// value.
pub struct PurchaseStep {
    name: &'static str,
    submit_fn: SubmitFn,
}

impl PurchaseStep {
    pub fn new<F, Fut>(name: &'static str, submit: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RelayResult<QueueId>> + Send + 'static,
    {
        Self {
            name,
            submit_fn: Box::new(move || submit().boxed()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Runs ordered step sequences with whole-sequence retry
pub struct PurchaseOrchestrator {
    supervisor: ConfirmationSupervisor,
    max_attempts: u32,
    retry_delay: Duration,
}

impl PurchaseOrchestrator {
    pub fn new(supervisor: ConfirmationSupervisor, config: &PurchaseConfig) -> Self {
        Self {
            supervisor,
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Execute the steps in order, each confirmed to mined before the next.
    /// Any step failure fails the attempt; failed attempts restart from step
    /// one after a fixed delay, up to the attempt cap.
    pub async fn execute(&self, steps: &[PurchaseStep]) -> RelayResult<()> {
        for attempt in 1..=self.max_attempts {
            metrics::record_purchase_attempt();
            match self.run_attempt(steps, attempt).await {
                Ok(()) => {
                    info!(attempt, "Purchase sequence completed");
                    metrics::record_purchase_completed();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "Purchase attempt failed: {}",
                        e
                    );
                    if attempt == self.max_attempts {
                        metrics::record_purchase_failed();
                        return Err(RelayError::PurchaseFailed {
                            attempts: self.max_attempts,
                        });
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        Err(RelayError::PurchaseFailed {
            attempts: self.max_attempts,
        })
    }

    async fn run_attempt(&self, steps: &[PurchaseStep], attempt: u32) -> RelayResult<()> {
        for step in steps {
            info!(step = step.name, attempt, "Submitting purchase step");
            let queue_id = (step.submit_fn)().await?;

            match self.supervisor.ensure_mined(queue_id.clone()).await? {
                Supervision::Mined => {
                    info!(step = step.name, %queue_id, "Purchase step confirmed");
                }
                Supervision::EscalatedToBackground(_) => {
                    // Budget exhaustion inside a step sequence is a step
                    // failure; the escalated monitor keeps chasing the old
                    // queue id while the sequence restarts cleanly.
                    return Err(RelayError::RetryBudgetExhausted {
                        queue_id: queue_id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
