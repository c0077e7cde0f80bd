//! Typed interface over the blockchain execution engine
//!
//! The engine is an external REST service that owns signing, nonces, and gas.
//! Submissions return an opaque queue identifier; the transaction then moves
//! through an asynchronous lifecycle (submitted -> mined/errored/cancelled)
//! which callers observe by polling.

pub mod client;

use crate::error::{RelayError, RelayResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::EngineClient;

/// Opaque handle identifying one submitted transaction on the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub String);

impl QueueId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-reported transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Submitted,
    Mined,
    Errored,
    Cancelled,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Submitted => "submitted",
            TxStatus::Mined => "mined",
            TxStatus::Errored => "errored",
            TxStatus::Cancelled => "cancelled",
        }
    }
}

/// Result of a status poll: the lifecycle state plus the raw engine payload
/// (mined block info and the like, passed through opaquely)
#[derive(Debug, Clone)]
pub struct StatusResult {
    pub status: TxStatus,
    pub raw: serde_json::Value,
}

/// One on-chain operation submitted through the engine
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EngineOperation {
    SetAllowance {
        token: String,
        owner: String,
        spender: String,
        amount: String,
    },
    BuyFromListing {
        marketplace: String,
        buyer: String,
        listing_id: String,
        quantity: String,
    },
    MintTo {
        contract: String,
        receiver: String,
        metadata: serde_json::Value,
        supply: String,
    },
    Burn {
        contract: String,
        owner: String,
        token_id: String,
        amount: String,
    },
    Transfer {
        contract: String,
        from: String,
        to: String,
        token_id: String,
        amount: String,
    },
    TokenTransfer {
        token: String,
        from: String,
        to: String,
        amount: String,
    },
    SetApprovalForAll {
        contract: String,
        owner: String,
        operator: String,
    },
}

impl EngineOperation {
    /// Short operation name for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            EngineOperation::SetAllowance { .. } => "set-allowance",
            EngineOperation::BuyFromListing { .. } => "buy-from-listing",
            EngineOperation::MintTo { .. } => "mint-to",
            EngineOperation::Burn { .. } => "burn",
            EngineOperation::Transfer { .. } => "transfer",
            EngineOperation::TokenTransfer { .. } => "token-transfer",
            EngineOperation::SetApprovalForAll { .. } => "set-approval-for-all",
        }
    }
}

/// A token held by a wallet, as reported by the engine's ownership read
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedToken {
    pub token_id: String,
    pub quantity: u64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Engine operations consumed by the reliability layer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Submit an on-chain operation; returns the engine's queue identifier
    async fn submit(&self, op: &EngineOperation) -> RelayResult<QueueId>;

    /// Poll the current lifecycle status of a submitted transaction.
    /// Pure probe: no internal retry, transport failures surface as
    /// `RelayError::Transport`.
    async fn status(&self, queue_id: &QueueId) -> RelayResult<StatusResult>;

    /// Ask the engine to retry a failed transaction
    async fn retry_failed(&self, queue_id: &QueueId) -> RelayResult<()>;

    /// Ask the engine for a synchronous re-attempt of a failed transaction
    async fn sync_retry(&self, queue_id: &QueueId) -> RelayResult<()>;

    /// List tokens a wallet owns on a contract
    async fn get_owned(&self, wallet: &str, contract: &str) -> RelayResult<Vec<OwnedToken>>;
}

/// Recovery primitive for engine-errored transactions.
///
/// Invoked only when a poll reports `errored`: requests a retry of the failed
/// transaction, then a synchronous re-attempt. Both calls may fail with a
/// transport error, which is propagated so the caller decides how to count it.
pub struct RecoveryDriver<'a> {
    engine: &'a dyn EngineApi,
}

impl<'a> RecoveryDriver<'a> {
    pub fn new(engine: &'a dyn EngineApi) -> Self {
        Self { engine }
    }

    pub async fn recover(&self, queue_id: &QueueId) -> RelayResult<()> {
        self.engine.retry_failed(queue_id).await?;
        self.engine.sync_retry(queue_id).await?;
        Ok(())
    }
}

/// Parse the engine's status string into the typed lifecycle state
pub(crate) fn parse_status(raw: &str) -> RelayResult<TxStatus> {
    match raw {
        "queued" | "sent" | "submitted" => Ok(TxStatus::Submitted),
        "mined" => Ok(TxStatus::Mined),
        "errored" => Ok(TxStatus::Errored),
        "cancelled" => Ok(TxStatus::Cancelled),
        other => Err(RelayError::EngineResponse(format!(
            "unknown transaction status {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_covers_lifecycle() {
        assert_eq!(parse_status("queued").unwrap(), TxStatus::Submitted);
        assert_eq!(parse_status("mined").unwrap(), TxStatus::Mined);
        assert_eq!(parse_status("errored").unwrap(), TxStatus::Errored);
        assert_eq!(parse_status("cancelled").unwrap(), TxStatus::Cancelled);
        assert!(parse_status("exploded").is_err());
    }

    #[tokio::test]
    async fn recovery_driver_orders_retry_then_sync() {
        let mut engine = MockEngineApi::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_retry_failed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        engine
            .expect_sync_retry()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let driver = RecoveryDriver::new(&engine);
        driver.recover(&QueueId("q1".into())).await.unwrap();
    }

    #[tokio::test]
    async fn recovery_driver_propagates_transport_failure() {
        let mut engine = MockEngineApi::new();
        engine
            .expect_retry_failed()
            .times(1)
            .returning(|_| Err(RelayError::Transport("connection reset".into())));
        engine.expect_sync_retry().never();

        let driver = RecoveryDriver::new(&engine);
        let err = driver.recover(&QueueId("q1".into())).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
