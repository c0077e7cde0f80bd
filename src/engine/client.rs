//! REST client for the execution engine
//!
//! Maps the typed `EngineApi` surface onto the engine's HTTP routes. Every
//! submission route returns a queue identifier wrapped in a `result` envelope;
//! the caller tracks the transaction from there.

use super::{parse_status, EngineApi, EngineOperation, OwnedToken, QueueId, StatusResult};
use crate::config::EngineConfig;
use crate::error::{RelayError, RelayResult};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const WALLET_HEADER: &str = "x-backend-wallet-address";

/// HTTP client for the execution engine
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    chain: String,
    admin_wallet: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuedResult {
    queue_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedTokenWire {
    metadata: serde_json::Value,
    #[serde(default)]
    quantity_owned: Option<String>,
}

impl EngineClient {
    pub fn new(config: &EngineConfig) -> RelayResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.access_token);
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|e| RelayError::Config(format!("Invalid engine access token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain: config.chain.clone(),
            admin_wallet: config.admin_wallet.clone(),
        })
    }

    /// Route and request body for a submission, plus the wallet the engine
    /// should execute it from
    fn submission_parts(&self, op: &EngineOperation) -> (String, String, serde_json::Value) {
        match op {
            EngineOperation::SetAllowance {
                token,
                owner,
                spender,
                amount,
            } => (
                format!(
                    "{}/contract/{}/{}/erc20/set-allowance",
                    self.base_url, self.chain, token
                ),
                owner.clone(),
                json!({ "spenderAddress": spender, "amount": amount }),
            ),
            EngineOperation::BuyFromListing {
                marketplace,
                buyer,
                listing_id,
                quantity,
            } => (
                format!(
                    "{}/contract/{}/{}/marketplace/direct-listings/buy-from-listing",
                    self.base_url, self.chain, marketplace
                ),
                buyer.clone(),
                json!({ "listingId": listing_id, "quantity": quantity, "buyer": buyer }),
            ),
            EngineOperation::MintTo {
                contract,
                receiver,
                metadata,
                supply,
            } => (
                format!(
                    "{}/contract/{}/{}/erc1155/mint-batch-to",
                    self.base_url, self.chain, contract
                ),
                self.admin_wallet.clone(),
                json!({
                    "receiver": receiver,
                    "metadataWithSupply": [{ "metadata": metadata, "supply": supply }],
                }),
            ),
            EngineOperation::Burn {
                contract,
                owner,
                token_id,
                amount,
            } => (
                format!(
                    "{}/contract/{}/{}/erc1155/burn",
                    self.base_url, self.chain, contract
                ),
                owner.clone(),
                json!({ "tokenId": token_id, "amount": amount }),
            ),
            EngineOperation::Transfer {
                contract,
                from,
                to,
                token_id,
                amount,
            } => (
                format!(
                    "{}/contract/{}/{}/erc1155/transfer-from",
                    self.base_url, self.chain, contract
                ),
                from.clone(),
                json!({ "from": from, "to": to, "tokenId": token_id, "amount": amount }),
            ),
            EngineOperation::TokenTransfer {
                token,
                from,
                to,
                amount,
            } => (
                format!(
                    "{}/contract/{}/{}/erc20/transfer",
                    self.base_url, self.chain, token
                ),
                from.clone(),
                json!({ "toAddress": to, "amount": amount }),
            ),
            EngineOperation::SetApprovalForAll {
                contract,
                owner,
                operator,
            } => (
                format!(
                    "{}/contract/{}/{}/erc1155/set-approval-for-all",
                    self.base_url, self.chain, contract
                ),
                owner.clone(),
                json!({ "operator": operator, "approved": true }),
            ),
        }
    }

    async fn check(&self, response: reqwest::Response) -> RelayResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(RelayError::EngineResponse(format!(
                "engine returned HTTP {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn submit(&self, op: &EngineOperation) -> RelayResult<QueueId> {
        let (url, wallet, body) = self.submission_parts(op);
        debug!(operation = op.kind(), %wallet, "Submitting engine operation");

        let response = self
            .http
            .post(&url)
            .header(WALLET_HEADER, &wallet)
            .json(&body)
            .send()
            .await?;
        let response = self.check(response).await?;

        let queued: Envelope<QueuedResult> = response
            .json()
            .await
            .map_err(|e| RelayError::EngineResponse(format!("malformed submit response: {}", e)))?;

        Ok(QueueId(queued.result.queue_id))
    }

    async fn status(&self, queue_id: &QueueId) -> RelayResult<StatusResult> {
        let url = format!("{}/transaction/status/{}", self.base_url, queue_id);
        let response = self.http.get(&url).send().await?;
        let response = self.check(response).await?;

        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| RelayError::EngineResponse(format!("malformed status response: {}", e)))?;

        let raw = envelope.result;
        let status_str = raw
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| RelayError::EngineResponse("status field missing".to_string()))?;
        let status = parse_status(status_str)?;

        Ok(StatusResult { status, raw })
    }

    async fn retry_failed(&self, queue_id: &QueueId) -> RelayResult<()> {
        let url = format!("{}/transaction/retry-failed", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "queueId": queue_id.as_str() }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn sync_retry(&self, queue_id: &QueueId) -> RelayResult<()> {
        let url = format!("{}/transaction/sync-retry", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "queueId": queue_id.as_str() }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn get_owned(&self, wallet: &str, contract: &str) -> RelayResult<Vec<OwnedToken>> {
        let url = format!(
            "{}/contract/{}/{}/erc1155/get-owned",
            self.base_url, self.chain, contract
        );
        let response = self
            .http
            .get(&url)
            .query(&[("walletAddress", wallet)])
            .send()
            .await?;
        let response = self.check(response).await?;

        let envelope: Envelope<Vec<OwnedTokenWire>> = response.json().await.map_err(|e| {
            RelayError::EngineResponse(format!("malformed get-owned response: {}", e))
        })?;

        let owned = envelope
            .result
            .into_iter()
            .map(|wire| {
                let token_id = wire
                    .metadata
                    .get("id")
                    .and_then(|id| id.as_str())
                    .unwrap_or_default()
                    .to_string();
                let quantity = wire
                    .quantity_owned
                    .as_deref()
                    .and_then(|q| q.parse::<u64>().ok())
                    .unwrap_or(0);
                OwnedToken {
                    token_id,
                    quantity,
                    metadata: wire.metadata,
                }
            })
            .collect();

        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> EngineClient {
        EngineClient::new(&EngineConfig {
            base_url: "https://engine.test/".to_string(),
            access_token: "secret".to_string(),
            admin_wallet: "0xadmin".to_string(),
            chain: "84532".to_string(),
            request_timeout_ms: 1_000,
        })
        .unwrap()
    }

    #[test]
    fn allowance_route_targets_token_contract() {
        let client = test_client();
        let (url, wallet, body) = client.submission_parts(&EngineOperation::SetAllowance {
            token: "0xtoken".into(),
            owner: "0xbuyer".into(),
            spender: "0xmarket".into(),
            amount: "25".into(),
        });
        assert_eq!(
            url,
            "https://engine.test/contract/84532/0xtoken/erc20/set-allowance"
        );
        assert_eq!(wallet, "0xbuyer");
        assert_eq!(body["spenderAddress"], "0xmarket");
    }

    #[test]
    fn mint_executes_from_admin_wallet() {
        let client = test_client();
        let (_, wallet, body) = client.submission_parts(&EngineOperation::MintTo {
            contract: "0xsoul".into(),
            receiver: "0xplayer".into(),
            metadata: json!({ "name": "soul" }),
            supply: "1".into(),
        });
        assert_eq!(wallet, "0xadmin");
        assert_eq!(body["receiver"], "0xplayer");
        assert_eq!(body["metadataWithSupply"][0]["supply"], "1");
    }
}
