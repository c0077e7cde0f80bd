//! Energy item consumption
//!
//! Recharging spends one energy bottle: verify the caller, check the wallet
//! actually owns the item, then burn it. The burn is a one-shot submission
//! under the simple retry policy; the energy refill itself lives in the
//! game's session store, outside this crate.

use super::with_simple_retry;
use crate::engine::{EngineApi, EngineOperation};
use crate::error::{RelayError, RelayResult};
use crate::interfaces::{AccessTokens, WalletDirectory};
use crate::metrics;
use crate::supervisor::SimpleRetryPolicy;

use std::sync::Arc;
use tracing::info;

/// Token id of the basic energy bottle on the miscellaneous items contract
const ENERGY_ITEM_TOKEN_ID: &str = "0";

pub struct EnergyItemsService {
    engine: Arc<dyn EngineApi>,
    tokens: Arc<dyn AccessTokens>,
    wallets: Arc<dyn WalletDirectory>,
    simple_retry: SimpleRetryPolicy,
    misc_items_contract: String,
}

impl EnergyItemsService {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        tokens: Arc<dyn AccessTokens>,
        wallets: Arc<dyn WalletDirectory>,
        simple_retry: SimpleRetryPolicy,
        misc_items_contract: String,
    ) -> Self {
        Self {
            engine,
            tokens,
            wallets,
            simple_retry,
            misc_items_contract,
        }
    }

    /// Consume one energy bottle from the caller's wallet
    pub async fn recharge(&self, token: &str) -> RelayResult<()> {
        let username = self.tokens.verify(token).await?;
        let wallet = self.wallets.wallet_address(&username).await?;

        self.check_energy_item(&wallet).await?;
        self.burn_energy_item(&wallet).await?;

        info!(%username, "Energy item consumed");
        Ok(())
    }

    async fn check_energy_item(&self, wallet: &str) -> RelayResult<()> {
        let owned = self
            .engine
            .get_owned(wallet, &self.misc_items_contract)
            .await?;

        let has_bottle = owned
            .iter()
            .any(|item| item.token_id == ENERGY_ITEM_TOKEN_ID && item.quantity >= 1);
        if !has_bottle {
            return Err(RelayError::Validation("No energy items owned".to_string()));
        }
        Ok(())
    }

    async fn burn_energy_item(&self, wallet: &str) -> RelayResult<()> {
        let op = EngineOperation::Burn {
            contract: self.misc_items_contract.clone(),
            owner: wallet.to_string(),
            token_id: ENERGY_ITEM_TOKEN_ID.to_string(),
            amount: "1".to_string(),
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
