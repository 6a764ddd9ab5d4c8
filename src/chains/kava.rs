use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::chains::models::*;
use crate::chains::traits::DualChainClient;
use crate::error::{AppError, AppResult};
use crate::wallet::keyring::Keyring;
use crate::wallet::models::{Network, SigningIdentity};

#[derive(Debug, Clone)]
pub struct KavaConfig {
    pub api_url: String,
    pub network: Network,
    pub request_timeout: Duration,
    /// Applied to height and swap listing calls
    pub query_timeout: Duration,
}

impl KavaConfig {
    pub fn chain_id(&self) -> &'static str {
        match self.network {
            Network::Mainnet => "kava_2222-10",
            Network::Testnet => "kava_2221-16000",
        }
    }
}

/// Amino JSON encodes 64-bit integers as strings
fn u64_from_str_or_int<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Str(value) => value.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    block: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    #[serde(deserialize_with = "u64_from_str_or_int")]
    height: u64,
}

/// `result` is null when the address has no swaps in that direction
#[derive(Debug, Deserialize)]
struct SwapQueryResponse {
    #[serde(default)]
    result: Option<Vec<AtomicSwapPayload>>,
}

#[derive(Debug, Deserialize)]
struct AtomicSwapPayload {
    id: String,
    status: String,
    #[serde(deserialize_with = "u64_from_str_or_int")]
    expire_height: u64,
}

impl AtomicSwapPayload {
    fn into_record(self, direction: SwapDirection) -> AppResult<SwapRecord> {
        let status = match self.status.as_str() {
            "Open" => SwapStatus::Open,
            "Expired" => SwapStatus::Expired,
            "Completed" => SwapStatus::Completed,
            other => {
                return Err(AppError::invalid_response(
                    Chain::Kava,
                    format!("Unknown swap status {:?} for {}", other, self.id),
                ))
            }
        };

        Ok(SwapRecord {
            swap_id: SwapId::new(self.id),
            status,
            expire_height: self.expire_height,
            direction,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    txhash: String,
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    raw_log: Option<String>,
}

/// REST (LCD) client for Kava
pub struct KavaRestClient {
    config: KavaConfig,
    identity: SigningIdentity,
    keyring: Arc<dyn Keyring>,
    client: reqwest::Client,
}

impl KavaRestClient {
    pub fn new(
        config: KavaConfig,
        identity: SigningIdentity,
        keyring: Arc<dyn Keyring>,
    ) -> AppResult<Self> {
        if config.api_url.trim().is_empty() {
            return Err(AppError::Config("Kava endpoint must be set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Kava HTTP client: {}", e)))?;

        Ok(Self {
            config,
            identity,
            keyring,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn query_swaps(
        &self,
        direction: SwapDirection,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>> {
        let role = match direction {
            SwapDirection::Outgoing => "sender",
            SwapDirection::Incoming => "recipient",
        };

        let response = self
            .client
            .get(self.url("/bep3/swaps"))
            .query(&[
                (role, address.to_string()),
                ("limit", limit.to_string()),
                ("page", page_for_offset(offset, limit).to_string()),
            ])
            .timeout(self.config.query_timeout)
            .send()
            .await
            .map_err(|e| AppError::connection(Chain::Kava, format!("Swap query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::connection(
                Chain::Kava,
                format!("Swap query returned HTTP {}", response.status()),
            ));
        }

        let body: SwapQueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::invalid_response(Chain::Kava, format!("{}", e)))?;

        let records = body
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|swap| swap.into_record(direction))
            .collect::<AppResult<Vec<_>>>()?;

        debug!(
            "Kava {} swaps for {} offset={} limit={} -> {}",
            direction,
            address,
            offset,
            limit,
            records.len()
        );
        Ok(records)
    }

    fn refund_document(&self, swap_id: &SwapId) -> serde_json::Value {
        serde_json::json!({
            "chain_id": self.config.chain_id(),
            "memo": "",
            "msgs": [{
                "type": "bep3/MsgRefundAtomicSwap",
                "value": {
                    "from": self.identity.address,
                    "swap_id": swap_id.as_str(),
                },
            }],
        })
    }
}

/// The LCD paginates by 1-based page number
pub fn page_for_offset(offset: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 1;
    }
    offset / limit + 1
}

#[async_trait]
impl DualChainClient for KavaRestClient {
    fn address(&self) -> &str {
        &self.identity.address
    }

    async fn latest_block_height(&self) -> AppResult<u64> {
        let response = self
            .client
            .get(self.url("/blocks/latest"))
            .timeout(self.config.query_timeout)
            .send()
            .await
            .map_err(|e| AppError::connection(Chain::Kava, format!("Node info failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::connection(
                Chain::Kava,
                format!("Node info returned HTTP {}", response.status()),
            ));
        }

        let latest: LatestBlock = response
            .json()
            .await
            .map_err(|e| AppError::invalid_response(Chain::Kava, format!("{}", e)))?;

        Ok(latest.block.header.height)
    }

    async fn list_swaps_by_creator(
        &self,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>> {
        self.query_swaps(SwapDirection::Outgoing, address, limit, offset)
            .await
    }

    async fn list_swaps_by_recipient(
        &self,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>> {
        self.query_swaps(SwapDirection::Incoming, address, limit, offset)
            .await
    }

    async fn submit_refund(&self, swap_id: &SwapId) -> AppResult<RefundReceipt> {
        let signed = self
            .keyring
            .sign(&self.identity, self.refund_document(swap_id))
            .await?;
        let tx: serde_json::Value = serde_json::from_str(&signed)
            .map_err(|e| AppError::Keyring(format!("Signer returned non-JSON tx: {}", e)))?;

        let response = self
            .client
            .post(self.url("/txs"))
            .json(&serde_json::json!({ "tx": tx, "mode": "sync" }))
            .send()
            .await
            .map_err(|e| AppError::submission(Chain::Kava, swap_id, format!("{}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::submission(
                Chain::Kava,
                swap_id,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let body: BroadcastResponse = response
            .json()
            .await
            .map_err(|e| AppError::submission(Chain::Kava, swap_id, format!("Bad broadcast response: {}", e)))?;

        if let Some(code) = body.code.filter(|code| *code != 0) {
            return Err(AppError::submission(
                Chain::Kava,
                swap_id,
                format!("code {}: {}", code, body.raw_log.unwrap_or_default()),
            ));
        }

        info!("Kava refund broadcast: swap {} (tx: {})", swap_id, body.txhash);
        Ok(RefundReceipt {
            status: status.as_u16(),
            tx_hash: body.txhash,
        })
    }
}
