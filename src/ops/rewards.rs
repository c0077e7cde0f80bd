//! Token reward payouts
//!
//! Song completion and daily login rewards are game-token transfers from the
//! treasury wallet to the player. Payouts are one-shot submissions under the
//! simple retry policy.

use super::with_simple_retry;
use crate::engine::{EngineApi, EngineOperation};
use crate::error::RelayResult;
use crate::interfaces::WalletDirectory;
use crate::metrics;
use crate::supervisor::SimpleRetryPolicy;

use std::sync::Arc;
use tracing::info;

pub struct RewardService {
    engine: Arc<dyn EngineApi>,
    wallets: Arc<dyn WalletDirectory>,
    simple_retry: SimpleRetryPolicy,
    token_contract: String,
    treasury_wallet: String,
}

impl RewardService {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        wallets: Arc<dyn WalletDirectory>,
        simple_retry: SimpleRetryPolicy,
        token_contract: String,
        treasury_wallet: String,
    ) -> Self {
        Self {
            engine,
            wallets,
            simple_retry,
            token_contract,
            treasury_wallet,
        }
    }

    /// Pay out a game-token reward to a player
    pub async fn send_token_reward(&self, username: &str, amount: &str) -> RelayResult<()> {
        let wallet = self.wallets.wallet_address(username).await?;
        info!(%username, amount, "Sending token reward");

        let op = EngineOperation::TokenTransfer {
            token: self.token_contract.clone(),
            from: self.treasury_wallet.clone(),
            to: wallet,
            amount: amount.to_string(),
        };
        with_simple_retry(&self.simple_retry, op.kind(), || async {
            let queue_id = self.engine.submit(&op).await?;
            metrics::record_tx_submitted(op.kind());
            Ok(queue_id)
        })
        .await?;

        Ok(())
    }
}
