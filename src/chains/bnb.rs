use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::chains::models::*;
use crate::chains::traits::AccountChainClient;
use crate::error::{AppError, AppResult};
use crate::wallet::keyring::Keyring;
use crate::wallet::models::{Network, SigningIdentity};

#[derive(Debug, Clone)]
pub struct BnbConfig {
    pub api_url: String,
    pub network: Network,
    pub request_timeout: Duration,
}

impl BnbConfig {
    pub fn chain_id(&self) -> &'static str {
        match self.network {
            Network::Mainnet => "Binance-Chain-Tigris",
            Network::Testnet => "Binance-Chain-Ganges",
        }
    }
}

/// Listing page as returned by the explorer API. `atomicSwaps` is absent when
/// the deputy has nothing in the requested status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtomicSwapPage {
    #[serde(default)]
    atomic_swaps: Option<Vec<HtltPayload>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HtltPayload {
    random_number_hash: String,
    #[serde(alias = "fromAddr")]
    from: String,
    #[serde(default)]
    sender_other_chain: Option<String>,
    status: u8,
}

impl HtltPayload {
    fn into_record(self) -> AppResult<HtltRecord> {
        let status = SwapStatus::from_bnb_code(self.status).ok_or_else(|| {
            AppError::invalid_response(Chain::Bnb, format!("Unknown swap status {}", self.status))
        })?;

        Ok(HtltRecord {
            random_number_hash: self.random_number_hash,
            sender: self.from,
            sender_other_chain: self.sender_other_chain.unwrap_or_default(),
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    account_number: u64,
    sequence: u64,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    hash: String,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    log: Option<String>,
}

/// REST client for the BNB Beacon chain explorer/node API
pub struct BnbRestClient {
    config: BnbConfig,
    identity: SigningIdentity,
    keyring: Arc<dyn Keyring>,
    client: reqwest::Client,
    account_number: Mutex<Option<u64>>,
}

impl BnbRestClient {
    pub fn new(
        config: BnbConfig,
        identity: SigningIdentity,
        keyring: Arc<dyn Keyring>,
    ) -> AppResult<Self> {
        if config.api_url.trim().is_empty() {
            return Err(AppError::Config("BNB endpoint must be set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build BNB HTTP client: {}", e)))?;

        Ok(Self {
            config,
            identity,
            keyring,
            client,
            account_number: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn account_number(&self) -> AppResult<u64> {
        let cached = *self.account_number.lock();
        if let Some(number) = cached {
            return Ok(number);
        }
        let meta = self.load_account(&self.identity.address).await?;
        Ok(meta.account_number)
    }

    fn refund_document(&self, swap_id: &SwapId, fee: u64, sequence: u64, account_number: u64) -> serde_json::Value {
        serde_json::json!({
            "chain_id": self.config.chain_id(),
            "account_number": account_number,
            "sequence": sequence,
            "source": 0,
            "memo": "",
            "fee": fee,
            "msgs": [{
                "type": "tokens/HTLTRefundMsg",
                "from": self.identity.address,
                "swap_id": swap_id.as_str(),
            }],
        })
    }
}

/// SHA-256 over the random number hash bytes, the sender's 20-byte account
/// address and the lower-cased counterparty address. Matches the id the chain
/// assigns at creation.
pub fn derive_swap_id(
    random_number_hash: &str,
    sender: &str,
    sender_other_chain: &str,
) -> AppResult<SwapId> {
    let rnh = hex::decode(random_number_hash.trim_start_matches("0x")).map_err(|e| {
        AppError::invalid_response(
            Chain::Bnb,
            format!("Bad random number hash {:?}: {}", random_number_hash, e),
        )
    })?;

    let (_, account) = bech32::decode(sender).map_err(|e| {
        AppError::invalid_response(Chain::Bnb, format!("Bad sender address {:?}: {}", sender, e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&rnh);
    hasher.update(&account);
    hasher.update(sender_other_chain.to_lowercase().as_bytes());

    Ok(SwapId::new(hex::encode(hasher.finalize())))
}

#[async_trait]
impl AccountChainClient for BnbRestClient {
    fn address(&self) -> &str {
        &self.identity.address
    }

    async fn list_swaps(
        &self,
        status: SwapStatus,
        offset: u64,
        limit: u64,
        timeout: Duration,
    ) -> AppResult<Vec<HtltRecord>> {
        let url = self.url("/api/v1/atomic-swaps");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("fromAddress", self.identity.address.clone()),
                ("status", status.bnb_code().to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::connection(Chain::Bnb, format!("Swap query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::connection(
                Chain::Bnb,
                format!("Swap query returned HTTP {}", response.status()),
            ));
        }

        let page: AtomicSwapPage = response
            .json()
            .await
            .map_err(|e| AppError::invalid_response(Chain::Bnb, format!("{}", e)))?;

        let records = page
            .atomic_swaps
            .unwrap_or_default()
            .into_iter()
            .map(HtltPayload::into_record)
            .collect::<AppResult<Vec<_>>>()?;

        debug!("BNB swap page offset={} limit={} -> {}", offset, limit, records.len());
        Ok(records)
    }

    async fn submit_refund(&self, swap_id: &SwapId, fee: u64, sequence: u64) -> AppResult<String> {
        let account_number = self.account_number().await?;
        let document = self.refund_document(swap_id, fee, sequence, account_number);
        let signed_tx = self.keyring.sign(&self.identity, document).await?;

        let response = self
            .client
            .post(self.url("/api/v1/broadcast"))
            .query(&[("sync", "true")])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(signed_tx)
            .send()
            .await
            .map_err(|e| AppError::submission(Chain::Bnb, swap_id, format!("{}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::submission(
                Chain::Bnb,
                swap_id,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let results: Vec<BroadcastResult> = response
            .json()
            .await
            .map_err(|e| AppError::submission(Chain::Bnb, swap_id, format!("Bad broadcast response: {}", e)))?;

        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::submission(Chain::Bnb, swap_id, "Empty broadcast response"))?;

        if !result.ok {
            return Err(AppError::submission(
                Chain::Bnb,
                swap_id,
                result.log.unwrap_or_else(|| "rejected".to_string()),
            ));
        }

        info!("BNB refund broadcast: swap {} seq {} (tx: {})", swap_id, sequence, result.hash);
        Ok(result.hash)
    }

    async fn load_account(&self, address: &str) -> AppResult<AccountMetadata> {
        let url = self.url(&format!("/api/v1/account/{}", address));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::connection(Chain::Bnb, format!("Account query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::connection(
                Chain::Bnb,
                format!("Account query returned HTTP {}", response.status()),
            ));
        }

        let account: AccountPayload = response
            .json()
            .await
            .map_err(|e| AppError::invalid_response(Chain::Bnb, format!("{}", e)))?;

        if address == self.identity.address {
            *self.account_number.lock() = Some(account.account_number);
        }

        Ok(AccountMetadata {
            account_number: account.account_number,
            sequence: account.sequence,
        })
    }

    fn compute_swap_id(
        &self,
        random_number_hash: &str,
        sender: &str,
        sender_other_chain: &str,
    ) -> AppResult<SwapId> {
        derive_swap_id(random_number_hash, sender, sender_other_chain)
    }
}
