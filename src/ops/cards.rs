//! Card gifting between players
//!
//! Moving a card edition token is two engine calls from the sender's wallet:
//! approve the operator, then transfer. Each is a one-shot submission under
//! the simple retry policy; the inventory relationship move in the graph
//! store is the caller's concern.

use super::with_simple_retry;
use crate::engine::{EngineApi, EngineOperation};
use crate::error::RelayResult;
use crate::interfaces::WalletDirectory;
use crate::metrics;
use crate::supervisor::SimpleRetryPolicy;

use std::sync::Arc;
use tracing::info;

pub struct CardGiftService {
    engine: Arc<dyn EngineApi>,
    wallets: Arc<dyn WalletDirectory>,
    simple_retry: SimpleRetryPolicy,
    edition_contract: String,
}

impl CardGiftService {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        wallets: Arc<dyn WalletDirectory>,
        simple_retry: SimpleRetryPolicy,
        edition_contract: String,
    ) -> Self {
        Self {
            engine,
            wallets,
            simple_retry,
            edition_contract,
        }
    }

    /// Gift one card edition token from sender to receiver
    pub async fn gift_card(
        &self,
        sender: &str,
        receiver: &str,
        card_token_id: &str,
    ) -> RelayResult<()> {
        let sender_wallet = self.wallets.wallet_address(sender).await?;
        let receiver_wallet = self.wallets.wallet_address(receiver).await?;
        info!(sender, receiver, card_token_id, "Gifting card");

        let approval = EngineOperation::SetApprovalForAll {
            contract: self.edition_contract.clone(),
            owner: sender_wallet.clone(),
            operator: sender_wallet.clone(),
        };
        self.submit_once(&approval).await?;

        let transfer = EngineOperation::Transfer {
            contract: self.edition_contract.clone(),
            from: sender_wallet.clone(),
            to: receiver_wallet,
            token_id: card_token_id.to_string(),
            amount: "1".to_string(),
        };
        self.submit_once(&transfer).await?;

        Ok(())
    }

    async fn submit_once(&self, op: &EngineOperation) -> RelayResult<()> {
        with_simple_retry(&self.simple_retry, op.kind(), || async {
            let queue_id = self.engine.submit(op).await?;
            metrics::record_tx_submitted(op.kind());
            Ok(queue_id)
        })
        .await?;
        Ok(())
    }
}
