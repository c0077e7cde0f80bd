//! Confirmation supervision for tracked transactions
//!
//! A submission is tracked by polling the engine until it reaches a terminal
//! state. The foreground supervisor blocks the caller under a small budget;
//! when that budget runs out without resolution, supervision escalates to a
//! detached background monitor with a longer budget of its own.

pub mod background;
pub mod confirm;

use crate::config::SupervisionConfig;
use crate::engine::QueueId;

use dashmap::DashMap;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use confirm::{ConfirmationSupervisor, TrackedTransaction};

/// Retry policy for tracked confirmation, foreground and background phases
#[derive(Debug, Clone)]
pub struct RetryBudget {
    /// Foreground poll iterations before escalating to background
    pub max_immediate_retries: u32,
    /// Wait between foreground polls
    pub retry_interval: Duration,
    /// In-place recovery attempts while foreground-supervised
    pub max_error_retries: u32,
    /// Background poll iterations before the transaction is abandoned
    pub max_background_retries: u32,
    /// Wait between background polls
    pub background_retry_interval: Duration,
}

impl RetryBudget {
    pub fn from_config(config: &SupervisionConfig) -> Self {
        Self {
            max_immediate_retries: config.max_immediate_retries,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
            max_error_retries: config.max_error_retries,
            max_background_retries: config.max_background_retries,
            background_retry_interval: Duration::from_millis(config.background_retry_interval_ms),
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_immediate_retries: 3,
            retry_interval: Duration::from_millis(3_000),
            max_error_retries: 5,
            max_background_retries: 10,
            background_retry_interval: Duration::from_millis(5_000),
        }
    }
}

/// Retry policy for one-shot submissions that accept the engine's
/// acknowledgement without tracking through to mined state
#[derive(Debug, Clone)]
pub struct SimpleRetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl SimpleRetryPolicy {
    pub fn from_config(config: &crate::config::SimpleRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl Default for SimpleRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(1_000),
        }
    }
}

/// Outcome of foreground supervision
#[derive(Debug)]
pub enum Supervision {
    /// Terminal success: the transaction is confirmed on-chain
    Mined,
    /// Foreground budget exhausted; supervision continues in the detached
    /// monitor task. Dropping the handle leaves the task running.
    EscalatedToBackground(JoinHandle<()>),
}

impl Supervision {
    pub fn is_mined(&self) -> bool {
        matches!(self, Supervision::Mined)
    }
}

/// Which supervision phase currently owns a queue id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionPhase {
    Foreground,
    Background,
}

/// In-flight supervision registry, read by the monitoring API
#[derive(Default)]
pub struct InFlightRegistry {
    entries: DashMap<QueueId, SupervisionPhase>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, queue_id: QueueId, phase: SupervisionPhase) {
        self.entries.insert(queue_id, phase);
    }

    pub fn resolve(&self, queue_id: &QueueId) {
        self.entries.remove(queue_id);
    }

    pub fn count(&self, phase: SupervisionPhase) -> usize {
        self.entries.iter().filter(|e| *e.value() == phase).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_counts_by_phase() {
        let registry = InFlightRegistry::new();
        registry.track(QueueId("a".into()), SupervisionPhase::Foreground);
        registry.track(QueueId("b".into()), SupervisionPhase::Background);
        registry.track(QueueId("a".into()), SupervisionPhase::Background);

        assert_eq!(registry.count(SupervisionPhase::Foreground), 0);
        assert_eq!(registry.count(SupervisionPhase::Background), 2);

        registry.resolve(&QueueId("a".into()));
        assert_eq!(registry.total(), 1);
    }
}
