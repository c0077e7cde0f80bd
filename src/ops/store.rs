//! Store purchase flows
//!
//! Card and card-upgrade purchases are two dependent on-chain steps: grant
//! the marketplace a spending allowance on the game token, then buy from the
//! listing. Both run as tracked transactions through the orchestrator. Pack
//! purchases stay untracked single submissions.

use super::with_simple_retry;
use crate::config::ContractsConfig;
use crate::engine::{EngineApi, EngineOperation, QueueId};
use crate::error::RelayResult;
use crate::interfaces::{AccessTokens, WalletDirectory};
use crate::metrics;
use crate::orchestrator::{PurchaseOrchestrator, PurchaseStep};
use crate::supervisor::SimpleRetryPolicy;

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct BuyCardRequest {
    pub listing_id: String,
    pub price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuyCardUpgradeRequest {
    pub listing_id: String,
    pub price: String,
    pub quantity: String,
}

/// Marketplace purchase service
pub struct StoreService {
    engine: Arc<dyn EngineApi>,
    tokens: Arc<dyn AccessTokens>,
    wallets: Arc<dyn WalletDirectory>,
    orchestrator: PurchaseOrchestrator,
    simple_retry: SimpleRetryPolicy,
    contracts: ContractsConfig,
}

impl StoreService {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        tokens: Arc<dyn AccessTokens>,
        wallets: Arc<dyn WalletDirectory>,
        orchestrator: PurchaseOrchestrator,
        simple_retry: SimpleRetryPolicy,
        contracts: ContractsConfig,
    ) -> Self {
        Self {
            engine,
            tokens,
            wallets,
            orchestrator,
            simple_retry,
            contracts,
        }
    }

    /// Buy a card from the card marketplace
    pub async fn buy_card(&self, token: &str, request: BuyCardRequest) -> RelayResult<()> {
        let username = self.tokens.verify(token).await?;
        let buyer = self.wallets.wallet_address(&username).await?;
        info!(%username, listing_id = %request.listing_id, "Card purchase requested");

        let steps = self.purchase_steps(
            &buyer,
            &self.contracts.card_marketplace,
            &request.listing_id,
            &request.price,
            "1",
        );
        self.orchestrator.execute(&steps).await
    }

    /// Buy a card upgrade from the upgrade marketplace
    pub async fn buy_card_upgrade(
        &self,
        token: &str,
        request: BuyCardUpgradeRequest,
    ) -> RelayResult<()> {
        let username = self.tokens.verify(token).await?;
        let buyer = self.wallets.wallet_address(&username).await?;
        info!(%username, listing_id = %request.listing_id, "Card upgrade purchase requested");

        let steps = self.purchase_steps(
            &buyer,
            &self.contracts.card_upgrade_marketplace,
            &request.listing_id,
            &request.price,
            &request.quantity,
        );
        self.orchestrator.execute(&steps).await
    }

    /// Buy a card pack: a single untracked submission under the simple
    /// retry policy
    pub async fn buy_card_pack(&self, token: &str, listing_id: &str) -> RelayResult<()> {
        let username = self.tokens.verify(token).await?;
        let buyer = self.wallets.wallet_address(&username).await?;
        info!(%username, listing_id, "Card pack purchase requested");

        let op = EngineOperation::BuyFromListing {
            marketplace: self.contracts.pack_marketplace.clone(),
            buyer,
            listing_id: listing_id.to_string(),
            quantity: "1".to_string(),
        };
        with_simple_retry(&self.simple_retry, op.kind(), || async {
            let queue_id = self.engine.submit(&op).await?;
            metrics::record_tx_submitted(op.kind());
            Ok(queue_id)
        })
        .await?;

        Ok(())
    }

    /// Allowance must be confirmed mined before the listing buy is submitted;
    /// the orchestrator enforces the ordering and the whole-sequence restart.
    fn purchase_steps(
        &self,
        buyer: &str,
        marketplace: &str,
        listing_id: &str,
        price: &str,
        quantity: &str,
    ) -> Vec<PurchaseStep> {
        let allowance = EngineOperation::SetAllowance {
            token: self.contracts.game_token.clone(),
            owner: buyer.to_string(),
            spender: marketplace.to_string(),
            amount: price.to_string(),
        };
        let buy = EngineOperation::BuyFromListing {
            marketplace: marketplace.to_string(),
            buyer: buyer.to_string(),
            listing_id: listing_id.to_string(),
            quantity: quantity.to_string(),
        };

        vec![
            tracked_step(self.engine.clone(), "set-allowance", allowance),
            tracked_step(self.engine.clone(), "buy-from-listing", buy),
        ]
    }
}

fn tracked_step(
    engine: Arc<dyn EngineApi>,
    name: &'static str,
    op: EngineOperation,
) -> PurchaseStep {
    PurchaseStep::new(name, move || {
        let engine = engine.clone();
        let op = op.clone();
        async move {
            let queue_id: QueueId = engine.submit(&op).await?;
            metrics::record_tx_submitted(op.kind());
            Ok(queue_id)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PurchaseConfig;
    use crate::engine::{MockEngineApi, StatusResult, TxStatus};
    use crate::error::RelayError;
    use crate::interfaces::{MockAccessTokens, MockWalletDirectory};
    use crate::supervisor::{ConfirmationSupervisor, InFlightRegistry, RetryBudget};
    use serde_json::json;

    fn contracts() -> ContractsConfig {
        ContractsConfig {
            game_token: "0xtoken".into(),
            card_marketplace: "0xcards".into(),
            card_upgrade_marketplace: "0xupgrades".into(),
            pack_marketplace: "0xpacks".into(),
            soul: "0xsoul".into(),
            misc_items: "0xitems".into(),
            edition: "0xedition".into(),
        }
    }

    fn service(engine: MockEngineApi) -> StoreService {
        let engine: Arc<dyn EngineApi> = Arc::new(engine);
        let supervisor = ConfirmationSupervisor::new(
            engine.clone(),
            RetryBudget::default(),
            Arc::new(InFlightRegistry::new()),
        );
        let orchestrator = PurchaseOrchestrator::new(
            supervisor,
            &PurchaseConfig {
                max_attempts: 3,
                retry_delay_ms: 3_000,
            },
        );

        let mut tokens = MockAccessTokens::new();
        tokens
            .expect_verify()
            .returning(|_| Ok("player1".to_string()));
        let mut wallets = MockWalletDirectory::new();
        wallets
            .expect_wallet_address()
            .returning(|_| Ok("0xbuyer".to_string()));

        StoreService::new(
            engine,
            Arc::new(tokens),
            Arc::new(wallets),
            orchestrator,
            SimpleRetryPolicy::default(),
            contracts(),
        )
    }

    fn mined() -> StatusResult {
        StatusResult {
            status: TxStatus::Mined,
            raw: json!({}),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn buy_card_confirms_allowance_before_purchase() {
        let mut engine = MockEngineApi::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|op| matches!(op, EngineOperation::SetAllowance { spender, .. } if spender == "0xcards"))
            .returning(|_| Ok(QueueId("q-allowance".into())));
        engine
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(mined()));
        engine
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|op| matches!(op, EngineOperation::BuyFromListing { listing_id, .. } if listing_id == "7"))
            .returning(|_| Ok(QueueId("q-buy".into())));
        engine
            .expect_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(mined()));

        service(engine)
            .buy_card(
                "jwt",
                BuyCardRequest {
                    listing_id: "7".into(),
                    price: "25".into(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_purchase_fails_after_all_attempts() {
        let mut engine = MockEngineApi::new();
        // Allowance submits fine but its transaction is cancelled every time
        engine
            .expect_submit()
            .times(3)
            .returning(|_| Ok(QueueId("q-allowance".into())));
        engine.expect_status().times(3).returning(|_| {
            Ok(StatusResult {
                status: TxStatus::Cancelled,
                raw: json!({}),
            })
        });

        let err = service(engine)
            .buy_card(
                "jwt",
                BuyCardRequest {
                    listing_id: "7".into(),
                    price: "25".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::PurchaseFailed { attempts: 3 }));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_submits_nothing() {
        let mut engine = MockEngineApi::new();
        engine.expect_submit().never();
        let engine: Arc<dyn EngineApi> = Arc::new(engine);

        let supervisor = ConfirmationSupervisor::new(
            engine.clone(),
            RetryBudget::default(),
            Arc::new(InFlightRegistry::new()),
        );
        let orchestrator = PurchaseOrchestrator::new(
            supervisor,
            &PurchaseConfig {
                max_attempts: 3,
                retry_delay_ms: 3_000,
            },
        );
        let mut tokens = MockAccessTokens::new();
        tokens
            .expect_verify()
            .returning(|_| Err(RelayError::Auth("expired token".into())));
        let mut wallets = MockWalletDirectory::new();
        wallets.expect_wallet_address().never();

        let service = StoreService::new(
            engine,
            Arc::new(tokens),
            Arc::new(wallets),
            orchestrator,
            SimpleRetryPolicy::default(),
            contracts(),
        );

        let err = service
            .buy_card_pack("stale-jwt", "3")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Auth(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn pack_purchase_is_untracked() {
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit()
            .times(1)
            .withf(|op| matches!(op, EngineOperation::BuyFromListing { marketplace, .. } if marketplace == "0xpacks"))
            .returning(|_| Ok(QueueId("q-pack".into())));
        engine.expect_status().never();

        service(engine).buy_card_pack("jwt", "3").await.unwrap();
    }
}
