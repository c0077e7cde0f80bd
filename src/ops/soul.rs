//! Soul NFT lifecycle
//!
//! Every player owns exactly one soul: an ERC-1155 token whose metadata
//! carries their achievements and mission history. Minting happens once at
//! account creation, from the engine's admin wallet, and the resulting token
//! id is written back to the player's graph node.

use super::with_simple_retry;
use crate::engine::{EngineApi, EngineOperation};
use crate::error::{RelayError, RelayResult};
use crate::interfaces::WalletDirectory;
use crate::metrics;
use crate::supervisor::SimpleRetryPolicy;

use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct SoulService {
    engine: Arc<dyn EngineApi>,
    wallets: Arc<dyn WalletDirectory>,
    simple_retry: SimpleRetryPolicy,
    soul_contract: String,
}

impl SoulService {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        wallets: Arc<dyn WalletDirectory>,
        simple_retry: SimpleRetryPolicy,
        soul_contract: String,
    ) -> Self {
        Self {
            engine,
            wallets,
            simple_retry,
            soul_contract,
        }
    }

    /// Mint the player's soul NFT and record its token id on their node
    pub async fn create_soul(&self, username: &str, wallet: &str) -> RelayResult<()> {
        let metadata = json!({
            "walletAddress": wallet,
            "name": username,
            "description": format!("This is {}'s soul", username),
            "uploader": "backbeat",
            "accountAchievements": [{ "rookie": true }],
            "personalMissions": [],
            "collectionMissions": [],
        });

        let op = EngineOperation::MintTo {
            contract: self.soul_contract.clone(),
            receiver: wallet.to_string(),
            metadata,
            supply: "1".to_string(),
        };
        with_simple_retry(&self.simple_retry, op.kind(), || async {
            let queue_id = self.engine.submit(&op).await?;
            metrics::record_tx_submitted(op.kind());
            Ok(queue_id)
        })
        .await?;

        self.save_soul(username, wallet).await?;
        info!(%username, "Soul created");
        Ok(())
    }

    async fn save_soul(&self, username: &str, wallet: &str) -> RelayResult<()> {
        let owned = self.engine.get_owned(wallet, &self.soul_contract).await?;
        let soul = owned.first().ok_or_else(|| {
            RelayError::EngineResponse(format!("no soul token reported for wallet {}", wallet))
        })?;

        self.wallets
            .write_field(username, "soul", &soul.token_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngineApi, OwnedToken, QueueId};
    use crate::interfaces::MockWalletDirectory;

    #[tokio::test(start_paused = true)]
    async fn mints_then_saves_the_token_id() {
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit()
            .times(1)
            .withf(|op| matches!(op, EngineOperation::MintTo { receiver, .. } if receiver == "0xplayer"))
            .returning(|_| Ok(QueueId("q-mint".into())));
        engine.expect_get_owned().times(1).returning(|_, _| {
            Ok(vec![OwnedToken {
                token_id: "42".to_string(),
                quantity: 1,
                metadata: serde_json::json!({ "id": "42" }),
            }])
        });

        let mut wallets = MockWalletDirectory::new();
        wallets
            .expect_write_field()
            .times(1)
            .withf(|username, field, value| {
                username == "player1" && field == "soul" && value == "42"
            })
            .returning(|_, _, _| Ok(()));

        let service = SoulService::new(
            Arc::new(engine),
            Arc::new(wallets),
            SimpleRetryPolicy::default(),
            "0xsoul".to_string(),
        );
        service.create_soul("player1", "0xplayer").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn mint_gives_up_after_retry_budget() {
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit()
            .times(3)
            .returning(|_| Err(RelayError::Transport("engine unreachable".into())));
        engine.expect_get_owned().never();

        let mut wallets = MockWalletDirectory::new();
        wallets.expect_write_field().never();

        let service = SoulService::new(
            Arc::new(engine),
            Arc::new(wallets),
            SimpleRetryPolicy::default(),
            "0xsoul".to_string(),
        );
        let err = service
            .create_soul("player1", "0xplayer")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::SubmissionFailed { .. }));
    }
}
