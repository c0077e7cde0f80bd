//! Game-facing on-chain operation services
//!
//! Store purchases run through the tracked orchestrator; reward and asset
//! wrappers use the weaker one-shot `simple_retry` policy, which accepts the
//! engine's submission acknowledgement without polling to mined state.

pub mod cards;
pub mod energy;
pub mod rewards;
pub mod soul;
pub mod store;

use crate::error::{RelayError, RelayResult};
use crate::supervisor::SimpleRetryPolicy;

use std::future::Future;
use tracing::warn;

/// Run a one-shot engine submission under the simple retry policy: up to
/// `max_retries` immediate attempts with a fixed delay in between, no
/// confirmation tracking.
pub async fn with_simple_retry<T, F, Fut>(
    policy: &SimpleRetryPolicy,
    operation: &str,
    call: F,
) -> RelayResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_retries {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    operation,
                    attempt,
                    max = policy.max_retries,
                    "Submission attempt failed: {}",
                    e
                );
                last_error = Some(e);
                if attempt < policy.max_retries {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(RelayError::SubmissionFailed {
        operation: operation.to_string(),
        attempts: policy.max_retries,
        message: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_retries: u32) -> SimpleRetryPolicy {
        SimpleRetryPolicy {
            max_retries,
            delay: Duration::from_millis(1_000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_simple_retry(&policy(3), "burn", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 2 {
                    Err(RelayError::Transport("timeout".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_operation_and_attempts() {
        let calls = AtomicU32::new(0);
        let err = with_simple_retry(&policy(3), "mint-to", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RelayError::Transport("timeout".into())) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err,
            RelayError::SubmissionFailed { attempts: 3, .. }
        ));
    }
}
